//! Command-line interface for synapse-hub
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Gesture-to-speech hub for the sensor glove
#[derive(Parser, Debug)]
#[command(
    name = "synapse-hub",
    version,
    about = "Gesture-to-speech hub for the sensor glove"
)]
pub struct Cli {
    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Overrides for a hub run. Flags win over the config file and environment.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Glove WebSocket URL (e.g., ws://192.168.4.1:81)
    #[arg(long, global = true, value_name = "URL")]
    pub sensor_url: Option<String>,

    /// Audio ingestion bind address (e.g., 0.0.0.0:8765)
    #[arg(long, global = true, value_name = "ADDR")]
    pub audio_bind: Option<String>,

    /// Telemetry bind address (e.g., 0.0.0.0:82)
    #[arg(long, global = true, value_name = "ADDR")]
    pub telemetry_bind: Option<String>,

    /// Minimum time between recognized gestures. Examples: 1, 1.5, 800ms, 2s
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub cooldown: Option<Duration>,
}

impl RunArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.sensor_url {
            config.sensor.url = url.clone();
        }
        if let Some(bind) = &self.audio_bind {
            config.audio.bind = bind.clone();
        }
        if let Some(bind) = &self.telemetry_bind {
            config.telemetry.bind = bind.clone();
        }
        if let Some(cooldown) = self.cooldown {
            config.gate.cooldown = cooldown;
        }
    }
}

/// Parse a duration string.
///
/// Bare numbers are seconds (fractions allowed); anything else goes through
/// `humantime` (`800ms`, `2s`, `1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|e| e.to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the hub (default when no subcommand is given)
    Run,

    /// View and initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Decode one sensor frame and print the result
    Decode {
        /// Raw frame, e.g. "<800,800,800,800,800,0.00,0.00,75>"
        frame: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
}
