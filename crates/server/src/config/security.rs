use serde::Deserialize;

/// Origins allowed to make credentialed cross-origin requests.
///
/// # Example
///
/// ```toml
/// [cors]
/// allowed_origins = ["https://www.exposrai.com"]
/// preview_prefix = "https://exposrmvp-"
/// preview_host = ".oshaea30s-projects.vercel.app"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Exact production origins.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Extra origin accepted only in development.
    #[serde(default = "default_development_origin")]
    pub development_origin: String,
    /// Preview deployments must start with this prefix...
    #[serde(default = "default_preview_prefix")]
    pub preview_prefix: String,
    /// ...and contain this host suffix.
    #[serde(default = "default_preview_host")]
    pub preview_host: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            development_origin: default_development_origin(),
            preview_prefix: default_preview_prefix(),
            preview_host: default_preview_host(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://exposrmvp.vercel.app".to_owned(),
        "https://www.exposrai.com".to_owned(),
    ]
}

fn default_development_origin() -> String {
    "http://localhost:3000".to_owned()
}

fn default_preview_prefix() -> String {
    "https://exposrmvp-".to_owned()
}

fn default_preview_host() -> String {
    ".oshaea30s-projects.vercel.app".to_owned()
}

/// Per-IP request limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Requests allowed per IP per window across `/api`.
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
    /// Failed admin logins allowed per IP per login window.
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u64,
    #[serde(default = "default_window_seconds")]
    pub login_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_seconds: default_window_seconds(),
            max_requests: default_max_requests(),
            login_max_attempts: default_login_max_attempts(),
            login_window_seconds: default_window_seconds(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_window_seconds() -> u64 {
    15 * 60
}

fn default_max_requests() -> u64 {
    100
}

fn default_login_max_attempts() -> u64 {
    5
}

/// Admin dashboard access.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Argon2 PHC string of the admin password. Login is refused when unset.
    pub password_hash: Option<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password_hash: None,
            token_ttl_seconds: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    3600
}

/// Secrets. Each one is generated per process when missing, outside
/// production.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// HS256 signing secret for admin tokens.
    pub jwt_secret: Option<String>,
    /// AES-256 key for at-rest encryption: 64 hex characters or base64.
    pub encryption_key: Option<String>,
    /// HMAC key for delete-code digests.
    pub delete_code_secret: Option<String>,
}
