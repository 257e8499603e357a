use crate::defaults;
use crate::error::{HubError, Result};
use crate::sensor::frame::VECTOR_LEN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub gate: GateConfig,
    pub classifier: ClassifierConfig,
    pub audio: AudioConfig,
    pub telemetry: TelemetryConfig,
    pub composer: ComposerConfig,
    pub speech: SpeechConfig,
}

/// Sensor source connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub url: String,
    #[serde(with = "duration_str")]
    pub retry_interval: Duration,
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_str")]
    pub ping_interval: Duration,
    #[serde(with = "duration_str")]
    pub ping_timeout: Duration,
}

/// Intent cooldown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    #[serde(with = "duration_str")]
    pub cooldown: Duration,
}

/// Gesture template matching
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub threshold: f32,
    pub flex_center: f32,
    pub flex_span: f32,
    pub gyro_span: f32,
    pub gestures: Vec<GestureTemplate>,
}

/// A named hand pose in raw sensor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureTemplate {
    pub label: String,
    pub vector: Vec<f32>,
}

/// Audio-ingestion endpoint and transcription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub bind: String,
    /// Whisper model: a name such as `tiny.en` or a path to a ggml file.
    /// Empty disables transcription.
    #[serde(alias = "model_path")]
    pub model: String,
    pub language: String,
    pub default_context: String,
}

/// Telemetry endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub bind: String,
    pub buffer: usize,
}

/// Phrase composer backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComposerConfig {
    pub backend: ComposerBackend,
    pub url: String,
    pub model: String,
    #[serde(with = "duration_str")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ComposerBackend {
    Ollama,
    Template,
}

/// Speech output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub command: String,
    pub base_wpm: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            url: defaults::SENSOR_URL.to_string(),
            retry_interval: defaults::RETRY_INTERVAL,
            connect_timeout: defaults::CONNECT_TIMEOUT,
            ping_interval: defaults::PING_INTERVAL,
            ping_timeout: defaults::PING_TIMEOUT,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown: defaults::COOLDOWN,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::MATCH_THRESHOLD,
            flex_center: defaults::FLEX_CENTER,
            flex_span: defaults::FLEX_SPAN,
            gyro_span: defaults::GYRO_SPAN,
            gestures: default_gestures(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bind: defaults::AUDIO_BIND.to_string(),
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            default_context: defaults::DEFAULT_CONTEXT.to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            bind: defaults::TELEMETRY_BIND.to_string(),
            buffer: defaults::TELEMETRY_BUFFER,
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            backend: ComposerBackend::Ollama,
            url: defaults::OLLAMA_URL.to_string(),
            model: defaults::OLLAMA_MODEL.to_string(),
            timeout: defaults::COMPOSER_TIMEOUT,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: defaults::SPEECH_COMMAND.to_string(),
            base_wpm: defaults::SPEECH_BASE_WPM,
        }
    }
}

/// Open hand, fist, pointing and peace sign with the hand held still.
fn default_gestures() -> Vec<GestureTemplate> {
    let pose = |label: &str, flex: [f32; 5]| GestureTemplate {
        label: label.to_string(),
        vector: flex.iter().copied().chain([0.0, 0.0]).collect(),
    };
    vec![
        pose("open", [800.0, 800.0, 800.0, 800.0, 800.0]),
        pose("fist", [300.0, 300.0, 300.0, 300.0, 300.0]),
        pose("point", [300.0, 800.0, 300.0, 300.0, 300.0]),
        pose("peace", [300.0, 800.0, 800.0, 300.0, 300.0]),
    ]
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HubError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                HubError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(HubError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SYNAPSE_SENSOR_URL → sensor.url
    /// - SYNAPSE_AUDIO_BIND → audio.bind
    /// - SYNAPSE_TELEMETRY_BIND → telemetry.bind
    /// - SYNAPSE_OLLAMA_URL → composer.url
    /// - SYNAPSE_OLLAMA_MODEL → composer.model
    pub fn with_env_overrides(mut self) -> Self {
        let overrides: [(&str, &mut String); 5] = [
            ("SYNAPSE_SENSOR_URL", &mut self.sensor.url),
            ("SYNAPSE_AUDIO_BIND", &mut self.audio.bind),
            ("SYNAPSE_TELEMETRY_BIND", &mut self.telemetry.bind),
            ("SYNAPSE_OLLAMA_URL", &mut self.composer.url),
            ("SYNAPSE_OLLAMA_MODEL", &mut self.composer.model),
        ];
        for (key, slot) in overrides {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
        self
    }

    /// Reject values the hub cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.url.trim().is_empty() {
            return Err(invalid("sensor.url", "must not be empty"));
        }
        if self.sensor.retry_interval.is_zero() {
            return Err(invalid("sensor.retry_interval", "must be greater than zero"));
        }
        for (key, value) in [
            ("sensor.connect_timeout", self.sensor.connect_timeout),
            ("sensor.ping_interval", self.sensor.ping_interval),
            ("sensor.ping_timeout", self.sensor.ping_timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(key, "must be greater than zero"));
            }
        }
        if self.gate.cooldown.is_zero() {
            return Err(invalid("gate.cooldown", "must be greater than zero"));
        }

        let c = &self.classifier;
        if !(c.threshold > 0.0 && c.threshold <= 1.0) {
            return Err(invalid("classifier.threshold", "must be in (0, 1]"));
        }
        if !(c.flex_span > 0.0) || !(c.gyro_span > 0.0) {
            return Err(invalid(
                "classifier.flex_span/gyro_span",
                "must be greater than zero",
            ));
        }
        for gesture in &c.gestures {
            if gesture.vector.len() != VECTOR_LEN {
                return Err(invalid(
                    "classifier.gestures",
                    &format!(
                        "gesture '{}' has {} values, expected {}",
                        gesture.label,
                        gesture.vector.len(),
                        VECTOR_LEN
                    ),
                ));
            }
        }

        if self.telemetry.buffer == 0 {
            return Err(invalid("telemetry.buffer", "must be greater than zero"));
        }
        if self.speech.base_wpm == 0 {
            return Err(invalid("speech.base_wpm", "must be greater than zero"));
        }
        Ok(())
    }

    /// Serialize the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HubError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/synapse-hub/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("synapse-hub").join("config.toml"))
            .ok_or_else(|| HubError::Other("Could not determine config directory".to_string()))
    }
}

fn invalid(key: &str, message: &str) -> HubError {
    HubError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Durations as human-readable strings ("2s", "500ms").
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
