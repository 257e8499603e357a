use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use synapse_hub::cli::{Cli, Commands, ConfigAction, RunArgs};
use synapse_hub::config::Config;
use synapse_hub::hub::Hub;
use synapse_hub::sensor::frame::decode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(cli.config.as_deref(), &cli.run)?;
            run_hub(config).await?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref(), &cli.run)?;
        }
        Some(Commands::Decode { frame }) => match decode(&frame) {
            Ok(sample) => println!("{}", serde_json::to_string_pretty(&sample)?),
            Err(reason) => {
                eprintln!("Rejected: {}", reason);
                std::process::exit(1);
            }
        },
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "synapse-hub",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over -q / -v.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_hub(config: Config) -> Result<()> {
    let hub = Hub::bind(config).await.context("failed to start hub")?;
    hub.run().await?;
    Ok(())
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order (highest first):
/// 1. CLI flags
/// 2. Environment variables
/// 3. Config file (--config, or ~/.config/synapse-hub/config.toml)
/// 4. Built-in defaults
fn load_config(custom_path: Option<&Path>, run: &RunArgs) -> Result<Config> {
    let mut config = match custom_path {
        // An explicit path must exist
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()?)?,
    }
    .with_env_overrides();

    run.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&Path>,
    run: &RunArgs,
) -> Result<()> {
    let path = config_path(custom_path)?;

    match action {
        ConfigAction::Show => {
            let mut config = Config::load_or_default(&path)?.with_env_overrides();
            run.apply(&mut config);
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, Config::default().to_toml()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
