//! Turning a gesture label into a spoken sentence.

use crate::config::{ComposerBackend, ComposerConfig};
use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Expands a recognized gesture into fluent speech, using the latest
/// transcript as conversational context.
#[async_trait::async_trait]
pub trait PhraseComposer: Send + Sync {
    async fn compose(&self, label: &str, context: &str) -> Result<String>;
}

/// Build the composer selected by configuration.
pub fn from_config(config: &ComposerConfig) -> Result<Arc<dyn PhraseComposer>> {
    Ok(match config.backend {
        ComposerBackend::Ollama => Arc::new(OllamaComposer::new(config)?),
        ComposerBackend::Template => Arc::new(TemplateComposer),
    })
}

/// Prompt asking the model to expand gesture shorthand.
pub fn build_prompt(label: &str, context: &str) -> String {
    let mut prompt = format!(
        "Convert this sign language shorthand: '{label}' into a full, polite sentence. "
    );
    if !context.trim().is_empty() {
        prompt.push_str(&format!("Context from the classroom: '{context}'"));
    }
    prompt
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

/// Composer backed by a local Ollama server's chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaComposer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaComposer {
    pub fn new(config: &ComposerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HubError::Composer {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl PhraseComposer for OllamaComposer {
    async fn compose(&self, label: &str, context: &str) -> Result<String> {
        let prompt = build_prompt(label, context);
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| HubError::Composer {
                message: format!("Request to {} failed: {e}", self.endpoint),
            })?;

        if !response.status().is_success() {
            return Err(HubError::Composer {
                message: format!("Ollama returned status {}", response.status()),
            });
        }

        let reply: ChatResponse = response.json().await.map_err(|e| HubError::Composer {
            message: format!("Failed to parse Ollama response: {e}"),
        })?;

        let text = reply.message.content.trim();
        if text.is_empty() {
            return Err(HubError::Composer {
                message: "Ollama returned an empty reply".to_string(),
            });
        }
        Ok(text.to_string())
    }
}

/// Offline composer: speaks the label verbatim inside a fixed sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateComposer;

#[async_trait::async_trait]
impl PhraseComposer for TemplateComposer {
    async fn compose(&self, label: &str, _context: &str) -> Result<String> {
        Ok(format!("I would like to say: {label}."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config_for(url: String) -> ComposerConfig {
        ComposerConfig {
            backend: ComposerBackend::Ollama,
            url,
            model: "llama3".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    /// Serve a single HTTP response and hand back the raw request.
    async fn one_shot_http(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let mut request = Vec::new();
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn prompt_includes_context_when_present() {
        let prompt = build_prompt("fist", "We are discussing chlorophyll.");
        assert!(prompt.starts_with("Convert this sign language shorthand: 'fist'"));
        assert!(prompt.ends_with("Context from the classroom: 'We are discussing chlorophyll.'"));
    }

    #[test]
    fn prompt_omits_empty_context() {
        let prompt = build_prompt("open", "  ");
        assert!(!prompt.contains("Context"));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let composer = OllamaComposer::new(&config_for("http://localhost:11434/".into())).unwrap();
        assert_eq!(composer.endpoint(), "http://localhost:11434/api/chat");
    }

    #[tokio::test]
    async fn template_composer_wraps_label() {
        let text = TemplateComposer.compose("peace", "ignored").await.unwrap();
        assert_eq!(text, "I would like to say: peace.");
    }

    #[tokio::test]
    async fn ollama_composer_returns_trimmed_reply() {
        let (url, server) = one_shot_http(
            "200 OK",
            r#"{"model":"llama3","message":{"role":"assistant","content":"  Could you repeat that, please?\n"},"done":true}"#,
        )
        .await;

        let composer = OllamaComposer::new(&config_for(url)).unwrap();
        let text = composer.compose("point", "Photosynthesis").await.unwrap();
        assert_eq!(text, "Could you repeat that, please?");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/chat"));
        assert!(request.contains(r#""model":"llama3""#));
        assert!(request.contains(r#""stream":false"#));
        assert!(request.contains("'point'"));
    }

    #[tokio::test]
    async fn ollama_composer_maps_http_error() {
        let (url, _server) = one_shot_http("500 Internal Server Error", "{}").await;
        let composer = OllamaComposer::new(&config_for(url)).unwrap();
        let err = composer.compose("fist", "").await.unwrap_err();
        assert!(matches!(err, HubError::Composer { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn ollama_composer_rejects_empty_reply() {
        let (url, _server) =
            one_shot_http("200 OK", r#"{"message":{"role":"assistant","content":"   "}}"#).await;
        let composer = OllamaComposer::new(&config_for(url)).unwrap();
        assert!(composer.compose("fist", "").await.is_err());
    }

    #[tokio::test]
    async fn ollama_composer_reports_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let composer = OllamaComposer::new(&config_for(format!("http://{addr}"))).unwrap();
        let err = composer.compose("fist", "").await.unwrap_err();
        assert!(matches!(err, HubError::Composer { .. }));
    }

    #[test]
    fn from_config_selects_backend() {
        let mut config = ComposerConfig::default();
        config.backend = ComposerBackend::Template;
        assert!(from_config(&config).is_ok());
        config.backend = ComposerBackend::Ollama;
        assert!(from_config(&config).is_ok());
    }
}
