//! Speech output through an external text-to-speech program.
//!
//! The `CommandExecutor` seam keeps the synthesizer testable without a TTS
//! engine installed.

use crate::config::SpeechConfig;
use crate::error::{HubError, Result};
use std::process::Command;
use std::sync::Arc;

/// Speaks text aloud. Calls may block for the duration of the utterance.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, speed: f32) -> Result<()>;
}

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments, returning its stdout.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HubError::SynthesisToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                HubError::Synthesis {
                    message: format!("Failed to execute {}: {}", command, e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HubError::Synthesis {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command, output.status, stderr
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Synthesizer that shells out to an espeak-compatible program:
/// `<command> -s <wpm> <text>`.
pub struct CommandSynthesizer<E: CommandExecutor> {
    executor: E,
    command: String,
    base_wpm: u32,
}

impl<E: CommandExecutor> CommandSynthesizer<E> {
    pub fn new(executor: E, command: impl Into<String>, base_wpm: u32) -> Self {
        Self {
            executor,
            command: command.into(),
            base_wpm,
        }
    }

    /// Words per minute for a speed multiplier. Never below 1.
    pub fn words_per_minute(&self, speed: f32) -> u32 {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        ((self.base_wpm as f32 * speed).round() as u32).max(1)
    }
}

impl<E: CommandExecutor> SpeechSynthesizer for CommandSynthesizer<E> {
    fn speak(&self, text: &str, speed: f32) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let wpm = self.words_per_minute(speed).to_string();
        // "--" keeps text starting with '-' from being read as an option.
        self.executor
            .execute(&self.command, &["-s", &wpm, "--", text])?;
        Ok(())
    }
}

/// Synthesizer used when speech output is disabled; logs instead of speaking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSynthesizer;

impl SpeechSynthesizer for SilentSynthesizer {
    fn speak(&self, text: &str, speed: f32) -> Result<()> {
        tracing::info!(speed, "speech disabled, would say: {text}");
        Ok(())
    }
}

/// Build the synthesizer selected by configuration.
pub fn from_config(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    if config.enabled {
        Arc::new(CommandSynthesizer::new(
            SystemCommandExecutor,
            config.command.clone(),
            config.base_wpm,
        ))
    } else {
        Arc::new(SilentSynthesizer)
    }
}
