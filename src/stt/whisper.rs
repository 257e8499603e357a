//! Whisper-based speech-to-text for classroom audio.
//!
//! The real engine sits behind the default `whisper` feature (cmake needed at
//! build time). A build without it:
//!
//! ```bash
//! cargo build --no-default-features
//! ```
//!
//! gets a stub `WhisperTranscriber` that validates the model path and reports
//! itself as not ready.

use crate::config::AudioConfig;
use crate::defaults;
use crate::error::{HubError, Result};
use crate::stt::transcriber::{NullTranscriber, Transcriber};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for Whisper transcriber.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub model_path: PathBuf,
    /// Language code (e.g. "en", "es")
    pub language: String,
    /// Inference threads; `None` lets whisper decide
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_of(config: &WhisperConfig) -> String {
    config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn ensure_model_exists(config: &WhisperConfig) -> Result<()> {
    if config.model_path.exists() {
        Ok(())
    } else {
        Err(HubError::TranscriptionModelNotFound {
            path: config.model_path.to_string_lossy().to_string(),
        })
    }
}

/// Convert 16-bit PCM to the [-1.0, 1.0] floats whisper expects.
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Load a ggml model from disk.
    ///
    /// # Errors
    /// `TranscriptionModelNotFound` if the file is missing, `Transcription`
    /// if whisper rejects it.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        ensure_model_exists(&config)?;
        let model_name = model_name_of(&config);

        let model_path = config
            .model_path
            .to_str()
            .ok_or_else(|| HubError::Transcription {
                message: "Invalid UTF-8 in model path".to_string(),
            })?;
        let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| HubError::Transcription {
                message: format!("Failed to load Whisper model: {}", e),
            })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Stub constructor: only checks that the model file exists.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        ensure_model_exists(&config)?;
        let model_name = model_name_of(&config);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        let audio_f32 = convert_audio(audio);

        let context = self.context.lock().map_err(|e| HubError::Transcription {
            message: format!("Failed to acquire context lock: {}", e),
        })?;

        let mut state = context
            .create_state()
            .map_err(|e| HubError::Transcription {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| HubError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }
        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _audio: &[i16]) -> Result<String> {
        Err(HubError::Transcription {
            message: "Whisper feature not enabled; rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Directory holding downloaded ggml models.
///
/// `$XDG_DATA_HOME/synapse-hub/models` on Linux.
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("synapse-hub")
        .join("models")
}

/// Resolve a configured model to a file path.
///
/// Paths (absolute, existing, or containing a separator) are used as given;
/// a bare name such as `tiny.en` maps to `ggml-tiny.en.bin` in `models_dir()`.
pub fn resolve_model_path(model: &str) -> PathBuf {
    resolve_model_path_in(model, &models_dir())
}

fn resolve_model_path_in(model: &str, dir: &Path) -> PathBuf {
    let path = PathBuf::from(model);
    if path.is_absolute() || path.exists() || model.contains('/') || model.contains('\\') {
        return path;
    }
    dir.join(format!("ggml-{model}.bin"))
}

/// Build the transcriber selected by the audio configuration.
///
/// An empty `audio.model` disables transcription (`NullTranscriber`, with a
/// warning). Anything else must load: a missing model file, or a model in a
/// build without the `whisper` feature, is an error.
pub fn from_config(config: &AudioConfig) -> Result<Arc<dyn Transcriber>> {
    let model = config.model.trim();
    if model.is_empty() {
        tracing::warn!("transcription disabled (audio.model is empty)");
        return Ok(Arc::new(NullTranscriber));
    }

    let transcriber = WhisperTranscriber::new(WhisperConfig {
        model_path: resolve_model_path(model),
        language: config.language.clone(),
        threads: None,
    })?;

    if !transcriber.is_ready() {
        return Err(HubError::Transcription {
            message: format!(
                "model {} configured but this build lacks the whisper feature",
                transcriber.model_name()
            ),
        });
    }

    tracing::info!(model = transcriber.model_name(), "speech model loaded");
    Ok(Arc::new(transcriber))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.language, "en");
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..Default::default()
        };

        match WhisperTranscriber::new(config) {
            Err(HubError::TranscriptionModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected TranscriptionModelNotFound error"),
        }
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_stub_extracts_model_name_and_is_not_ready() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("ggml-base.en.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();

        let transcriber = WhisperTranscriber::new(WhisperConfig {
            model_path,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(transcriber.model_name(), "ggml-base.en");
        assert!(!transcriber.is_ready());
        assert!(transcriber.transcribe(&[0i16; 160]).is_err());
    }

    #[test]
    fn test_convert_audio_i16_to_f32() {
        let converted = convert_audio(&[0i16, 16384, -16384, 32767, -32768]);
        assert_eq!(converted[0], 0.0);
        assert!((converted[1] - 0.5).abs() < 0.01);
        assert!((converted[2] + 0.5).abs() < 0.01);
        assert!((converted[3] - 1.0).abs() < 0.01);
        assert_eq!(converted[4], -1.0);
    }

    #[test]
    fn test_default_config_names_a_model() {
        let config = AudioConfig::default();
        assert_eq!(config.model, defaults::DEFAULT_MODEL);
        let path = resolve_model_path(&config.model);
        assert!(path.ends_with("synapse-hub/models/ggml-tiny.en.bin"));
    }

    #[test]
    fn test_from_config_with_empty_model_uses_null() {
        for model in ["", "   "] {
            let config = AudioConfig {
                model: model.to_string(),
                ..Default::default()
            };
            let transcriber = from_config(&config).unwrap();
            assert_eq!(transcriber.model_name(), "none");
            assert!(!transcriber.is_ready());
        }
    }

    #[test]
    fn test_from_config_with_missing_model_fails() {
        let config = AudioConfig {
            model: "/nonexistent/ggml-tiny.bin".to_string(),
            ..Default::default()
        };
        match from_config(&config) {
            Err(e @ HubError::TranscriptionModelNotFound { .. }) => {
                assert!(e.to_string().contains("audio.model"));
            }
            Err(other) => panic!("Expected TranscriptionModelNotFound, got {}", other),
            Ok(_) => panic!("Expected TranscriptionModelNotFound"),
        }
    }

    #[test]
    fn test_resolve_model_path_names_and_paths() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_model_path_in("base.en", dir.path()),
            dir.path().join("ggml-base.en.bin")
        );
        assert_eq!(
            resolve_model_path_in("/opt/models/custom.bin", dir.path()),
            PathBuf::from("/opt/models/custom.bin")
        );
        assert_eq!(
            resolve_model_path_in("models/custom.bin", dir.path()),
            PathBuf::from("models/custom.bin")
        );
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_from_config_with_model_requires_whisper_feature() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("ggml-tiny.en.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();
        let config = AudioConfig {
            model: model_path.to_string_lossy().to_string(),
            ..Default::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(HubError::Transcription { .. })
        ));
    }

    #[test]
    fn test_whisper_transcriber_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WhisperTranscriber>();
    }
}
