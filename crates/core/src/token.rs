//! Identifier generation and delete-code digests.

use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::IdentifierError;

type HmacSha256 = Hmac<Sha256>;

const ANALYSIS_ID_BYTES: usize = 8;
const DELETE_CODE_BYTES: usize = 12;

const ANALYSIS_ID_MAX_LEN: usize = 64;
const DELETE_CODE_MIN_LEN: usize = 8;
const DELETE_CODE_MAX_LEN: usize = 64;

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// 16 lowercase hex characters. No collision check is made against any store.
pub fn generate_analysis_id() -> String {
    random_hex(ANALYSIS_ID_BYTES)
}

/// 24 lowercase hex characters, disclosed to the uploader exactly once.
pub fn generate_delete_code() -> String {
    random_hex(DELETE_CODE_BYTES)
}

pub fn generate_feedback_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn validate_token(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Missing(field));
    }
    if value.len() < min || value.len() > max {
        return Err(IdentifierError::Length { field, min, max });
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(IdentifierError::InvalidCharacters(field));
    }
    Ok(())
}

/// Analysis ids are 1-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_analysis_id(id: &str) -> Result<(), IdentifierError> {
    validate_token("analysisId", id, 1, ANALYSIS_ID_MAX_LEN)
}

/// Delete codes are 8-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_delete_code(code: &str) -> Result<(), IdentifierError> {
    validate_token("deleteCode", code, DELETE_CODE_MIN_LEN, DELETE_CODE_MAX_LEN)
}

/// Keyed digest of delete codes (HMAC-SHA256, hex).
///
/// Only the digest is ever persisted. A record is located by recomputing the
/// digest of the presented code, so the plaintext never has to be reversed.
#[derive(Clone)]
pub struct DeleteCodeHasher {
    key: Vec<u8>,
}

impl std::fmt::Debug for DeleteCodeHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteCodeHasher")
            .field("key", &"[redacted]")
            .finish()
    }
}

impl DeleteCodeHasher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// A hasher with a fresh random 32-byte key. Digests do not survive a
    /// restart.
    pub fn ephemeral() -> Self {
        let mut key = vec![0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn digest(&self, code: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(code.trim().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of `code` against a stored digest.
    pub fn verify(&self, code: &str, digest: &str) -> bool {
        let expected = self.digest(code);
        expected.as_bytes().ct_eq(digest.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_have_expected_shape() {
        let id = generate_analysis_id();
        assert_eq!(id.len(), 16);
        assert!(validate_analysis_id(&id).is_ok());

        let code = generate_delete_code();
        assert_eq!(code.len(), 24);
        assert!(validate_delete_code(&code).is_ok());
        assert_ne!(code, generate_delete_code());
    }

    #[test]
    fn identifier_validation() {
        assert_eq!(
            validate_analysis_id(""),
            Err(IdentifierError::Missing("analysisId"))
        );
        assert_eq!(
            validate_analysis_id("abc'); DROP"),
            Err(IdentifierError::InvalidCharacters("analysisId"))
        );
        assert!(matches!(
            validate_delete_code("short"),
            Err(IdentifierError::Length { .. })
        ));
        assert!(validate_delete_code("EXP-abc_123").is_ok());
    }

    #[test]
    fn digest_is_keyed() {
        let a = DeleteCodeHasher::new(b"secret-a".to_vec());
        let b = DeleteCodeHasher::new(b"secret-b".to_vec());
        assert_ne!(a.digest("code1234"), b.digest("code1234"));
        assert_eq!(a.digest("code1234"), a.digest("code1234"));
        assert_eq!(a.digest("code1234").len(), 64);
    }

    #[test]
    fn verify_accepts_only_matching_code() {
        let hasher = DeleteCodeHasher::new(b"k".to_vec());
        let digest = hasher.digest("0123456789abcdef01234567");
        assert!(hasher.verify("0123456789abcdef01234567", &digest));
        assert!(hasher.verify(" 0123456789abcdef01234567\n", &digest));
        assert!(!hasher.verify("0123456789abcdef01234568", &digest));
        assert!(!hasher.verify("0123456789abcdef01234567", "not-a-digest"));
    }

    #[test]
    fn debug_redacts_key() {
        let hasher = DeleteCodeHasher::new(b"super-secret".to_vec());
        assert!(!format!("{hasher:?}").contains("super-secret"));
    }
}
