//! Row types for the two logical tables.
//!
//! Binary material is stored as text: salts hex-encoded, ciphertext blobs
//! base64url. The accessors decode and validate; a bad row surfaces as
//! [`StoreError::Corrupt`], never as a silently wrong value.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub const SALT_LEN: usize = 16;

/// One provisioned identity: salt + wrapped data key + expiry, replaced as a
/// unit on renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub username: String,
    pub salt_hex: String,
    pub wrapped_key_b64: String,
    pub expires_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(
        username: &str,
        salt: &[u8; SALT_LEN],
        wrapped_key: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.to_string(),
            salt_hex: hex::encode(salt),
            wrapped_key_b64: URL_SAFE_NO_PAD.encode(wrapped_key),
            expires_at,
        }
    }

    pub fn salt(&self) -> Result<[u8; SALT_LEN], StoreError> {
        let bytes = hex::decode(&self.salt_hex)
            .map_err(|e| StoreError::Corrupt(format!("identity salt: {e}")))?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Corrupt(format!("identity salt: {} bytes", bytes.len())))
    }

    pub fn wrapped_key(&self) -> Result<Vec<u8>, StoreError> {
        URL_SAFE_NO_PAD
            .decode(&self.wrapped_key_b64)
            .map_err(|e| StoreError::Corrupt(format!("wrapped key: {e}")))
    }
}

/// One encrypted application record, owned by an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub username: String,
    pub record_id: String,
    pub blob_b64: String,
}

impl EncryptedRecord {
    pub fn new(username: &str, record_id: &str, blob: &[u8]) -> Self {
        Self {
            username: username.to_string(),
            record_id: record_id.to_string(),
            blob_b64: URL_SAFE_NO_PAD.encode(blob),
        }
    }

    pub fn blob(&self) -> Result<Vec<u8>, StoreError> {
        URL_SAFE_NO_PAD
            .decode(&self.blob_b64)
            .map_err(|e| StoreError::Corrupt(format!("record blob: {e}")))
    }
}
