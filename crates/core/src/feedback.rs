use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::generate_feedback_id;

/// Maximum length of a feedback comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// The user's judgement of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum FeedbackType {
    Accurate,
    Inaccurate,
}

impl FeedbackType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accurate => "accurate",
            Self::Inaccurate => "inaccurate",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accurate" => Ok(Self::Accurate),
            "inaccurate" => Ok(Self::Inaccurate),
            other => Err(format!("unknown feedback type: {other}")),
        }
    }
}

/// Trim a free-text comment and cap it at [`MAX_COMMENT_CHARS`].
///
/// Blank input yields `None`.
pub fn sanitize_comment(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_COMMENT_CHARS).collect())
}

/// One piece of user feedback about an analysis.
///
/// `analysis_id` is a loose reference; the store does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeedbackRecord {
    pub feedback_id: String,
    pub analysis_id: String,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        analysis_id: impl Into<String>,
        feedback_type: FeedbackType,
        comment: Option<&str>,
    ) -> Self {
        Self {
            feedback_id: generate_feedback_id(),
            analysis_id: analysis_id.into(),
            feedback_type,
            comment: comment.and_then(sanitize_comment),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_type_parsing() {
        assert_eq!("accurate".parse::<FeedbackType>(), Ok(FeedbackType::Accurate));
        assert_eq!(" Inaccurate ".parse::<FeedbackType>(), Ok(FeedbackType::Inaccurate));
        assert!("meh".parse::<FeedbackType>().is_err());
    }

    #[test]
    fn blank_comment_is_dropped() {
        assert_eq!(sanitize_comment("   \n"), None);
        let record = FeedbackRecord::new("abc", FeedbackType::Inaccurate, Some("  "));
        assert!(record.comment.is_none());
    }

    #[test]
    fn long_comment_is_truncated_on_char_boundary() {
        let raw = "é".repeat(MAX_COMMENT_CHARS + 20);
        let comment = sanitize_comment(&raw).unwrap();
        assert_eq!(comment.chars().count(), MAX_COMMENT_CHARS);
    }

    #[test]
    fn new_record_gets_unique_id() {
        let a = FeedbackRecord::new("abc", FeedbackType::Accurate, None);
        let b = FeedbackRecord::new("abc", FeedbackType::Accurate, None);
        assert_ne!(a.feedback_id, b.feedback_id);
        assert_eq!(a.analysis_id, "abc");
    }

    #[test]
    fn serializes_lowercase_type() {
        let record = FeedbackRecord::new("abc", FeedbackType::Inaccurate, Some("wrong"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["feedbackType"], "inaccurate");
        assert_eq!(json["comment"], "wrong");
    }
}
