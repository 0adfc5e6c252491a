use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// Claims embedded in admin tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    /// Expiry (seconds since epoch).
    pub exp: u64,
}

/// Issues and validates HS256 admin tokens.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: &[u8], expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_seconds,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Issue an admin token. Returns the token and its lifetime in seconds.
    pub fn issue(&self) -> Result<(String, u64), String> {
        let claims = Claims {
            sub: ADMIN_ROLE.to_owned(),
            role: ADMIN_ROLE.to_owned(),
            exp: jsonwebtoken::get_current_timestamp() + self.expiry_seconds,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| format!("JWT encoding failed: {e}"))?;
        Ok((token, self.expiry_seconds))
    }

    /// Check signature, expiry and role.
    pub fn validate(&self, token: &str) -> Result<Claims, String> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| format!("invalid token: {e}"))?;
        if data.claims.role != ADMIN_ROLE {
            return Err(format!("unexpected role {:?}", data.claims.role));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let manager = JwtManager::new(b"secret", 3600);
        let (token, ttl) = manager.issue().unwrap();
        assert_eq!(ttl, 3600);
        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let (token, _) = JwtManager::new(b"one", 3600).issue().unwrap();
        assert!(JwtManager::new(b"two", 3600).validate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = JwtManager::new(b"secret", 3600);
        let claims = Claims {
            sub: "admin".into(),
            role: "admin".into(),
            exp: jsonwebtoken::get_current_timestamp() - 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn non_admin_role_is_rejected() {
        let claims = Claims {
            sub: "someone".into(),
            role: "viewer".into(),
            exp: jsonwebtoken::get_current_timestamp() + 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(JwtManager::new(b"secret", 60).validate(&token).is_err());
    }
}
