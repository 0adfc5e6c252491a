pub mod crypto;
pub mod jwt;
pub mod middleware;
pub mod password;

use tracing::{info, warn};

use self::jwt::{Claims, JwtManager};

/// Why an admin login was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    MissingPassword,
    /// No password hash is configured; every login is refused.
    NotConfigured,
    InvalidCredentials,
    Token(String),
}

/// Password check and token handling for the admin dashboard.
pub struct AdminAuth {
    password_hash: Option<String>,
    jwt: JwtManager,
}

impl AdminAuth {
    pub fn new(password_hash: Option<String>, jwt_secret: &[u8], token_ttl_seconds: u64) -> Self {
        Self {
            password_hash: password_hash.filter(|h| !h.trim().is_empty()),
            jwt: JwtManager::new(jwt_secret, token_ttl_seconds),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Verify `password` and issue a token with its lifetime in seconds.
    pub fn login(&self, password: &str) -> Result<(String, u64), LoginError> {
        if password.is_empty() {
            return Err(LoginError::MissingPassword);
        }
        let Some(hash) = &self.password_hash else {
            warn!("admin login attempted but no password hash is configured");
            return Err(LoginError::NotConfigured);
        };
        if !password::verify_password(hash, password) {
            warn!("admin login failed");
            return Err(LoginError::InvalidCredentials);
        }
        let issued = self.jwt.issue().map_err(LoginError::Token)?;
        info!("admin login succeeded");
        Ok(issued)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, String> {
        self.jwt.validate(token)
    }
}
