use std::time::Duration;

use exposr_detector::HuggingFaceConfig;
use exposr_media_cloudinary::CloudinaryConfig;
use exposr_store_airtable::AirtableConfig;
use serde::Deserialize;

/// Which analysis backend serves `POST /api/analyze`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisBackend {
    #[default]
    HuggingFace,
    /// Random verdicts. Refused in production.
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub backend: AnalysisBackend,
    /// Upper bound on one detector call; exceeding it answers 408.
    #[serde(default = "default_analysis_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub huggingface: HuggingFaceSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: AnalysisBackend::default(),
            timeout_seconds: default_analysis_timeout(),
            huggingface: HuggingFaceSettings::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_analysis_timeout() -> u64 {
    60
}

/// Hugging Face inference settings; unset fields keep the detector defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HuggingFaceSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Tried when the primary model answers with an error status.
    pub fallback_model: Option<String>,
    /// Confidence below which a verdict is reported as inconclusive.
    pub inconclusive_below: Option<u8>,
}

impl HuggingFaceSettings {
    /// Build the detector configuration. `None` when no API key is set.
    pub fn to_detector_config(&self, timeout: Duration) -> Option<HuggingFaceConfig> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let mut config = HuggingFaceConfig::new(key).with_timeout(timeout);
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if self.fallback_model.is_some() {
            config = config.with_fallback_model(self.fallback_model.clone());
        }
        if let Some(threshold) = self.inconclusive_below {
            config = config.with_inconclusive_below(threshold);
        }
        Some(config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Airtable,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub airtable: Option<AirtableConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    #[default]
    Memory,
    Cloudinary,
    /// Records are stored without images.
    None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub backend: MediaBackend,
    pub cloudinary: Option<CloudinaryConfig>,
}
