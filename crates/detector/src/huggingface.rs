use std::time::Duration;

use exposr_core::{ImageUpload, Verdict, explanation_for};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::detector::{Detection, Detector};
use crate::error::DetectorError;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_MODEL: &str = "Hemg/Deepfake-Detection";
const DEFAULT_FALLBACK_MODEL: &str = "google/vit-base-patch16-224";

/// Label fragments that mark a prediction as machine-generated.
const AI_LABEL_MARKERS: [&str; 5] = ["fake", "deepfake", "synthetic", "ai-generated", "artificial"];

/// Number of top labels echoed as evidence.
const EVIDENCE_LABELS: usize = 3;

/// Configuration for [`HuggingFaceDetector`].
#[derive(Clone)]
pub struct HuggingFaceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Tried once when the primary model answers with a non-success status.
    pub fallback_model: Option<String>,
    pub timeout: Duration,
    /// Top-label confidence below this is reported as inconclusive.
    pub inconclusive_below: u8,
}

impl std::fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("timeout", &self.timeout)
            .field("inconclusive_below", &self.inconclusive_below)
            .finish()
    }
}

impl HuggingFaceConfig {
    /// Defaults to the `Hemg/Deepfake-Detection` model with a ViT fallback,
    /// a 60-second timeout, and an inconclusive band below 60.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_owned()),
            timeout: Duration::from_secs(60),
            inconclusive_below: 60,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_inconclusive_below(mut self, threshold: u8) -> Self {
        self.inconclusive_below = threshold;
        self
    }
}

/// One `{label, score}` entry of an image-classification response.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Some pipelines wrap the list in an outer array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

/// Image classification through the Hugging Face inference API.
pub struct HuggingFaceDetector {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceDetector {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, DetectorError> {
        if config.api_key.trim().is_empty() {
            return Err(DetectorError::Configuration(
                "Hugging Face API key is not set".into(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DetectorError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Use a custom HTTP client, e.g. to share a connection pool.
    pub fn with_client(config: HuggingFaceConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn classify(
        &self,
        model: &str,
        upload: &ImageUpload,
    ) -> Result<Vec<LabelScore>, DetectorError> {
        let url = format!("{}/models/{model}", self.config.base_url);
        debug!(%url, bytes = upload.len(), "calling inference endpoint");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(upload.bytes.clone())
            .send()
            .await
            .map_err(|e| DetectorError::from_reqwest(&e, self.config.timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DetectorError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| DetectorError::from_reqwest(&e, self.config.timeout))?;
        let parsed: ClassificationResponse = serde_json::from_str(&text)
            .map_err(|e| DetectorError::InvalidResponse(format!("{e}: {text}")))?;

        let mut labels = match parsed {
            ClassificationResponse::Flat(v) => v,
            ClassificationResponse::Nested(v) => v.into_iter().flatten().collect(),
        };
        if labels.is_empty() {
            return Err(DetectorError::InvalidResponse(
                "empty classification list".into(),
            ));
        }
        labels.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(labels)
    }

    /// Turn sorted label scores into a detection.
    fn interpret(&self, model: &str, labels: Vec<LabelScore>) -> Detection {
        let top = &labels[0];
        let confidence = to_percent(top.score);
        let is_ai = is_ai_label(&top.label);

        let verdict = if confidence < self.config.inconclusive_below {
            Verdict::Inconclusive
        } else if is_ai {
            Verdict::AiGenerated
        } else {
            Verdict::LikelyHuman
        };

        let evidence = labels
            .iter()
            .take(EVIDENCE_LABELS)
            .map(|l| format!("{model}: \"{}\" scored {}%", l.label, to_percent(l.score)))
            .collect();

        Detection {
            verdict,
            confidence,
            is_ai,
            explanation: explanation_for(is_ai, confidence).to_owned(),
            evidence,
            raw: serde_json::to_value(&labels).ok(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn is_ai_label(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    AI_LABEL_MARKERS.iter().any(|m| label.contains(m))
}

impl Detector for HuggingFaceDetector {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "huggingface"
    }

    #[instrument(skip(self, upload), fields(model = %self.config.model, filename = %upload.filename))]
    async fn detect(&self, upload: &ImageUpload) -> Result<Detection, DetectorError> {
        match self.classify(&self.config.model, upload).await {
            Ok(labels) => Ok(self.interpret(&self.config.model, labels)),
            Err(DetectorError::Status { status, body }) => {
                let Some(fallback) = self.config.fallback_model.as_deref() else {
                    return Err(DetectorError::Status { status, body });
                };
                warn!(status, %body, fallback, "primary model failed, trying fallback model");
                let labels = self.classify(fallback, upload).await?;
                Ok(self.interpret(fallback, labels))
            }
            Err(e) => Err(e),
        }
    }
}
