//! Gesture recognition from the 7-channel glove vector.

use crate::config::ClassifierConfig;
use crate::error::{HubError, Result};
use crate::sensor::frame::VECTOR_LEN;

/// Maps a sensor vector to a gesture label.
///
/// Implementations must be cheap enough to run once per frame on the
/// ingestion task.
pub trait GestureClassifier: Send + Sync {
    /// Return the recognized label, or `None` when nothing matches at
    /// `threshold` similarity.
    fn classify(&self, vector: &[f32; VECTOR_LEN], threshold: f32) -> Option<String>;
}

#[derive(Debug, Clone)]
struct Template {
    label: String,
    normalized: [f32; VECTOR_LEN],
}

/// Cosine-similarity matcher against a fixed set of hand poses.
///
/// Raw readings are centered and scaled before comparison so that an open
/// hand and a fist point in opposite directions instead of being parallel.
#[derive(Debug, Clone)]
pub struct TemplateClassifier {
    templates: Vec<Template>,
    flex_center: f32,
    flex_span: f32,
    gyro_span: f32,
}

impl TemplateClassifier {
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let mut classifier = Self {
            templates: Vec::with_capacity(config.gestures.len()),
            flex_center: config.flex_center,
            flex_span: config.flex_span,
            gyro_span: config.gyro_span,
        };
        for gesture in &config.gestures {
            let vector: [f32; VECTOR_LEN] =
                gesture.vector.as_slice().try_into().map_err(|_| {
                    HubError::ConfigInvalidValue {
                        key: "classifier.gestures".to_string(),
                        message: format!(
                            "gesture '{}' has {} values, expected {}",
                            gesture.label,
                            gesture.vector.len(),
                            VECTOR_LEN
                        ),
                    }
                })?;
            let normalized = classifier.normalize(&vector);
            classifier.templates.push(Template {
                label: gesture.label.clone(),
                normalized,
            });
        }
        Ok(classifier)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.label.as_str())
    }

    fn normalize(&self, raw: &[f32; VECTOR_LEN]) -> [f32; VECTOR_LEN] {
        let mut out = [0.0; VECTOR_LEN];
        for (i, (dst, &value)) in out.iter_mut().zip(raw).enumerate() {
            *dst = if i < 5 {
                (value - self.flex_center) / self.flex_span
            } else {
                value / self.gyro_span
            };
        }
        out
    }

    /// Best (label, similarity) regardless of threshold.
    pub fn best_match(&self, vector: &[f32; VECTOR_LEN]) -> Option<(&str, f32)> {
        let query = self.normalize(vector);
        let mut best: Option<(&str, f32)> = None;
        for template in &self.templates {
            let score = cosine_similarity(&query, &template.normalized);
            match best {
                Some((_, current)) if score <= current => {}
                _ => best = Some((template.label.as_str(), score)),
            }
        }
        best
    }
}

impl GestureClassifier for TemplateClassifier {
    fn classify(&self, vector: &[f32; VECTOR_LEN], threshold: f32) -> Option<String> {
        self.best_match(vector)
            .filter(|&(_, score)| score >= threshold)
            .map(|(label, _)| label.to_string())
    }
}

/// Cosine similarity; 0.0 when either vector has zero length.
pub fn cosine_similarity(a: &[f32; VECTOR_LEN], b: &[f32; VECTOR_LEN]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
