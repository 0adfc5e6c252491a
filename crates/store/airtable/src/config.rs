use std::time::Duration;

use serde::Deserialize;

/// Connection settings for an Airtable base.
#[derive(Clone, Deserialize)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_analyses_table")]
    pub analyses_table: String,
    #[serde(default = "default_feedback_table")]
    pub feedback_table: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.airtable.com".to_owned()
}

fn default_analyses_table() -> String {
    "Analyses".to_owned()
}

fn default_feedback_table() -> String {
    "Feedback".to_owned()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl AirtableConfig {
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
            base_url: default_base_url(),
            analyses_table: default_analyses_table(),
            feedback_table: default_feedback_table(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_id", &self.base_id)
            .field("base_url", &self.base_url)
            .field("analyses_table", &self.analyses_table)
            .field("feedback_table", &self.feedback_table)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}
