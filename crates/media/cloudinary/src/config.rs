use std::time::Duration;

use serde::Deserialize;

/// Connection settings for a Cloudinary account.
#[derive(Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Folder every upload is placed under.
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Uploads are limited to this many pixels on each side.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_timeout", with = "secs")]
    pub timeout: Duration,
}

fn default_base_url() -> String {
    "https://api.cloudinary.com".to_owned()
}

fn default_folder() -> String {
    "exposr".to_owned()
}

fn default_max_dimension() -> u32 {
    1024
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: default_base_url(),
            folder: default_folder(),
            max_dimension: default_max_dimension(),
            timeout: default_timeout(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Eager transformation applied on upload.
    pub fn transformation(&self) -> String {
        let max = self.max_dimension;
        format!("c_limit,w_{max},h_{max},q_auto")
    }

    pub(crate) fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/{action}", self.base_url, self.cloud_name)
    }
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("folder", &self.folder)
            .field("max_dimension", &self.max_dimension)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_transformation() {
        let config = CloudinaryConfig::new("demo", "key", "secret");
        assert_eq!(config.folder, "exposr");
        assert_eq!(config.transformation(), "c_limit,w_1024,h_1024,q_auto");
        assert_eq!(
            config.endpoint("image/upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = CloudinaryConfig::new("demo", "key", "s3cr3t");
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let config = CloudinaryConfig::new("demo", "k", "s").with_base_url("http://127.0.0.1:9/");
        assert_eq!(
            config.endpoint("image/destroy"),
            "http://127.0.0.1:9/v1_1/demo/image/destroy"
        );
    }
}
