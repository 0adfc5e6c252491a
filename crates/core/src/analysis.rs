use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification label attached to every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Verdict {
    #[serde(rename = "Likely Human-Created")]
    LikelyHuman,
    #[serde(rename = "AI-Generated")]
    AiGenerated,
    #[serde(rename = "Inconclusive")]
    Inconclusive,
}

impl Verdict {
    pub const ALL: [Self; 3] = [Self::LikelyHuman, Self::AiGenerated, Self::Inconclusive];

    pub fn label(self) -> &'static str {
        match self {
            Self::LikelyHuman => "Likely Human-Created",
            Self::AiGenerated => "AI-Generated",
            Self::Inconclusive => "Inconclusive",
        }
    }

    /// Parse a stored label back into a verdict.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.label() == label)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explanation text for a detector result, chosen by direction and
/// confidence band (>= 90, >= 70, below).
pub fn explanation_for(is_ai: bool, confidence: u8) -> &'static str {
    match (is_ai, confidence) {
        (true, 90..) => {
            "Analysis detected strong patterns characteristic of AI-generated content, including artificial lighting, synthetic textures, or computational artifacts."
        }
        (true, 70..) => {
            "Analysis detected inconsistencies in pixel patterns and lighting that are characteristic of AI-generated content."
        }
        (true, _) => {
            "Some signs of potential AI generation detected, but result requires careful interpretation."
        }
        (false, 90..) => {
            "Analysis shows natural patterns consistent with authentic photography, including realistic lighting and textures."
        }
        (false, 70..) => {
            "Content appears authentic with natural photographic characteristics and consistent metadata."
        }
        (false, _) => {
            "Content appears more likely to be authentic, though some analysis uncertainty remains."
        }
    }
}

/// The outcome of analyzing one uploaded image.
///
/// Produced once per request and returned to the uploader. This is the only
/// place the plaintext `delete_code` ever appears; persisted records carry a
/// keyed digest instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnalysisResult {
    #[cfg_attr(feature = "openapi", schema(example = "3f9a1c0e5b7d2468"))]
    pub analysis_id: String,
    pub filename: String,
    /// Confidence in the verdict, 0-100.
    pub confidence: u8,
    pub verdict: Verdict,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "openapi", schema(example = "JPEG"))]
    pub file_format: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(rename = "fileSizeKB")]
    pub file_size_kb: u64,
    pub delete_code: String,
    pub explanation: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub detection_details: Option<serde_json::Value>,
    /// Set when the result was synthesized locally after the remote
    /// analysis path failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl AnalysisResult {
    /// Everything except the delete code and raw detector payload.
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
            explanation: self.explanation.clone(),
            evidence: self.evidence.clone(),
            image_url: None,
        }
    }
}

/// Public subset of an analysis, safe to serve to anyone holding the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PublicAnalysis {
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
    pub explanation: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
