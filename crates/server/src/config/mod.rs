mod backends;
mod security;
mod server;
mod telemetry;


pub use backends::*;
pub use security::*;
pub use server::*;
pub use telemetry::*;

use exposr_intake::ValidationPolicy;
use exposr_media_cloudinary::CloudinaryConfig;
use exposr_store_airtable::AirtableConfig;
use serde::Deserialize;
use thiserror::Error;

/// Problems found while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration for the Exposr server, loaded from a TOML file
/// and then overridden from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct ExposrConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Upload size and type limits.
    #[serde(default)]
    pub uploads: ValidationPolicy,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ExposrConfig {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.is_production()
    }

    /// Apply the recognized environment variables on top of the file
    /// values. Empty variables are ignored.
    ///
    /// Setting both Airtable variables selects the Airtable store; setting
    /// all three Cloudinary variables selects the Cloudinary media host.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(env) = var("EXPOSR_ENV").or_else(|| var("NODE_ENV")) {
            self.server.environment = Environment::from_env_value(&env);
        }
        if let Some(urls) = var("FRONTEND_URL") {
            for origin in parse_origin_list(&urls) {
                if !self.cors.allowed_origins.contains(&origin) {
                    self.cors.allowed_origins.push(origin);
                }
            }
        }

        if let Some(window_ms) = var("RATE_LIMIT_WINDOW_MS") {
            let ms: u64 = parse_env("RATE_LIMIT_WINDOW_MS", &window_ms)?;
            self.rate_limit.window_seconds = (ms / 1000).max(1);
        }
        if let Some(max) = var("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_env("RATE_LIMIT_MAX_REQUESTS", &max)?;
        }

        if let Some(size) = var("MAX_FILE_SIZE") {
            self.uploads.max_file_size = parse_env("MAX_FILE_SIZE", &size)?;
        }
        if let Some(types) = var("ALLOWED_FILE_TYPES") {
            self.uploads.allowed_types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect();
        }

        if let Some(key) = var("HUGGINGFACE_API_KEY") {
            self.analysis.huggingface.api_key = Some(key);
        }

        if let (Some(key), Some(base)) = (var("AIRTABLE_API_KEY"), var("AIRTABLE_BASE_ID")) {
            let airtable = match self.storage.airtable.take() {
                Some(mut existing) => {
                    existing.api_key = key;
                    existing.base_id = base;
                    existing
                }
                None => AirtableConfig::new(key, base),
            };
            self.storage.airtable = Some(airtable);
            self.storage.backend = StorageBackend::Airtable;
        }

        if let (Some(cloud), Some(key), Some(secret)) = (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            let cloudinary = match self.media.cloudinary.take() {
                Some(mut existing) => {
                    existing.cloud_name = cloud;
                    existing.api_key = key;
                    existing.api_secret = secret;
                    existing
                }
                None => CloudinaryConfig::new(cloud, key, secret),
            };
            self.media.cloudinary = Some(cloudinary);
            self.media.backend = MediaBackend::Cloudinary;
        }

        if let Some(secret) = var("JWT_SECRET") {
            self.security.jwt_secret = Some(secret);
        }
        if let Some(key) = var("ENCRYPTION_KEY") {
            self.security.encryption_key = Some(key);
        }
        if let Some(secret) = var("DELETE_CODE_SECRET") {
            self.security.delete_code_secret = Some(secret);
        }
        if let Some(hash) = var("ADMIN_PASSWORD_HASH") {
            self.admin.password_hash = Some(hash);
        }
        Ok(())
    }

    /// Reject combinations the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled
            && (self.rate_limit.window_seconds == 0
                || self.rate_limit.max_requests == 0
                || self.rate_limit.login_window_seconds == 0)
        {
            return Err(ConfigError::Invalid(
                "rate limit windows and maximums must be positive".into(),
            ));
        }
        if self.uploads.max_file_size == 0 {
            return Err(ConfigError::Invalid("uploads.max_file_size must be positive".into()));
        }
        if self.storage.backend == StorageBackend::Airtable && self.storage.airtable.is_none() {
            return Err(ConfigError::Invalid(
                "storage.backend = \"airtable\" requires [storage.airtable] or AIRTABLE_API_KEY and AIRTABLE_BASE_ID".into(),
            ));
        }
        if self.media.backend == MediaBackend::Cloudinary && self.media.cloudinary.is_none() {
            return Err(ConfigError::Invalid(
                "media.backend = \"cloudinary\" requires [media.cloudinary] or the CLOUDINARY_* variables".into(),
            ));
        }

        if self.is_production() {
            if self.analysis.backend == AnalysisBackend::Simulated {
                return Err(ConfigError::Invalid(
                    "the simulated analysis backend is not available in production".into(),
                ));
            }
            let missing: Vec<&str> = [
                ("JWT_SECRET", self.security.jwt_secret.is_none()),
                ("ENCRYPTION_KEY", self.security.encryption_key.is_none()),
                ("DELETE_CODE_SECRET", self.security.delete_code_secret.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            if !missing.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "production requires {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_owned(),
    })
}

/// Split a list of origins on commas or whitespace.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
