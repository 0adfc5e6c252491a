//! At-rest encryption of request metadata and operator secrets.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use exposr_store::ContextSealer;
use rand::RngCore;

const MARKER_PREFIX: &str = "ENC[AES256-GCM,";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Parse a 32-byte key from 64 hex characters or base64.
pub fn parse_key(raw: &str) -> Result<[u8; 32], String> {
    let trimmed = raw.trim();
    if trimmed.len() == 64
        && let Ok(bytes) = hex::decode(trimmed)
        && let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice())
    {
        return Ok(key);
    }
    if let Ok(bytes) = B64.decode(trimmed)
        && let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice())
    {
        return Ok(key);
    }
    Err("ENCRYPTION_KEY must be 32 bytes encoded as 64 hex chars or base64".to_owned())
}

/// AES-256-GCM sealing of short strings into `ENC[AES256-GCM,data:..,iv:..,tag:..]`.
#[derive(Clone)]
pub struct AtRestCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for AtRestCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtRestCipher")
            .field("key", &"[redacted]")
            .finish()
    }
}

impl AtRestCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn from_encoded(raw: &str) -> Result<Self, String> {
        parse_key(raw).map(Self::new)
    }

    /// A cipher with a fresh random key. Sealed values do not survive a
    /// restart.
    pub fn ephemeral() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, String> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| format!("invalid AES key: {e}"))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| format!("encryption failed: {e}"))?;

        // Output is ciphertext || 16-byte tag.
        let (data, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{MARKER_PREFIX}data:{},iv:{},tag:{}]",
            B64.encode(data),
            B64.encode(nonce.as_slice()),
            B64.encode(tag),
        ))
    }

    /// Open a value produced by [`encrypt`](Self::encrypt). Values without the
    /// marker are returned unchanged.
    pub fn decrypt(&self, value: &str) -> Result<String, String> {
        let trimmed = value.trim();
        let Some(inner) = trimmed
            .strip_prefix(MARKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            return Ok(value.to_owned());
        };

        let field = |name: &str| -> Result<Vec<u8>, String> {
            let encoded = inner
                .split(',')
                .find_map(|part| part.trim().strip_prefix(name))
                .ok_or_else(|| format!("missing {name} field"))?;
            B64.decode(encoded)
                .map_err(|e| format!("invalid base64 in {name} {e}"))
        };
        let mut data = field("data:")?;
        let iv = field("iv:")?;
        let tag = field("tag:")?;
        if iv.len() != NONCE_LEN {
            return Err(format!("IV must be {NONCE_LEN} bytes, got {}", iv.len()));
        }
        if tag.len() != TAG_LEN {
            return Err(format!("tag must be {TAG_LEN} bytes, got {}", tag.len()));
        }
        data.extend_from_slice(&tag);

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|e| format!("invalid AES key: {e}"))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), data.as_ref())
            .map_err(|_| "decryption failed (wrong key or corrupted data)".to_owned())?;
        String::from_utf8(plaintext).map_err(|e| format!("decrypted value is not UTF-8: {e}"))
    }
}

impl ContextSealer for AtRestCipher {
    fn seal(&self, plaintext: &str) -> Result<String, String> {
        self.encrypt(plaintext)
    }
}
