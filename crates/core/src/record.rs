use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, PublicAnalysis, Verdict, explanation_for};

/// Request metadata captured alongside a stored analysis.
///
/// Sealed before it reaches the tabular store; see `encrypted_context`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// A persisted analysis row in the tabular store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Store-assigned row id. Empty until the row has been created.
    #[serde(default)]
    pub record_id: String,
    pub analysis_id: String,
    pub filename: String,
    pub confidence: u8,
    pub verdict: Verdict,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    pub timestamp: DateTime<Utc>,
    pub file_format: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(rename = "fileSizeKB")]
    pub file_size_kb: u64,
    pub delete_code_digest: String,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub research_consent: bool,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub encrypted_context: Option<String>,
}

impl StoredRecord {
    /// Build the row for `result`. The plaintext delete code is dropped;
    /// only `delete_code_digest` is kept.
    pub fn from_result(result: &AnalysisResult, delete_code_digest: String) -> Self {
        Self {
            record_id: String::new(),
            analysis_id: result.analysis_id.clone(),
            filename: result.filename.clone(),
            confidence: result.confidence,
            verdict: result.verdict,
            is_ai: result.is_ai,
            timestamp: result.timestamp,
            file_format: result.file_format.clone(),
            image_width: result.image_width,
            image_height: result.image_height,
            file_size_kb: result.file_size_kb,
            delete_code_digest,
            media_id: None,
            image_url: None,
            research_consent: false,
            country: None,
            region: None,
            encrypted_context: None,
        }
    }

    #[must_use]
    pub fn with_research_consent(mut self, granted: bool) -> Self {
        self.research_consent = granted;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media_id: impl Into<String>, image_url: impl Into<String>) -> Self {
        self.media_id = Some(media_id.into());
        self.image_url = Some(image_url.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, country: Option<String>, region: Option<String>) -> Self {
        self.country = country;
        self.region = region;
        self
    }

    #[must_use]
    pub fn with_encrypted_context(mut self, sealed: Option<String>) -> Self {
        self.encrypted_context = sealed;
        self
    }

    /// Public view with the explanation regenerated from the confidence band.
    pub fn public_view(&self) -> PublicAnalysis {
        PublicAnalysis {
            analysis_id: self.analysis_id.clone(),
            filename: self.filename.clone(),
            confidence: self.confidence,
            verdict: self.verdict,
            is_ai: self.is_ai,
            timestamp: self.timestamp,
            file_format: self.file_format.clone(),
            image_width: self.image_width,
            image_height: self.image_height,
            file_size_kb: self.file_size_kb,
            explanation: explanation_for(self.is_ai, self.confidence).to_owned(),
            evidence: Vec::new(),
            image_url: self.image_url.clone(),
        }
    }
}
