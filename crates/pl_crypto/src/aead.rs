//! Authenticated encryption
//!
//! Uses AES-256-GCM. Key size: 32 bytes. Nonce: 12 bytes (random, generated
//! inside every call — never caller-supplied). Tag: 16 bytes.
//!
//! Blob wire format, for wrapped keys and encrypted records alike:
//!   [ nonce (12 bytes) | ciphertext + tag ]
//!
//! Key wrapping and record encryption use distinct AAD domain strings, so a
//! wrapped-key blob can never be fed to the record decryptor or vice versa.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

const KEY_WRAP_AAD: &[u8] = b"pl-key-wrap-v1";
const RECORD_AAD: &[u8] = b"pl-record-v1";

/// 32-byte data-encryption key issued by the key authority. Zeroized on
/// drop. Persisted only in wrapped form; lives unwrapped in memory solely
/// inside an unlocked session.
#[derive(ZeroizeOnDrop)]
pub struct DataKey(pub(crate) [u8; KEY_LEN]);

impl DataKey {
    /// Accept raw key bytes from the authority (length-checked).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Generate a random key (tests and in-test authorities).
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

fn seal(key: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadEncrypt)?;

    // Prepend nonce
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(key: &[u8; KEY_LEN], blob: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::AeadDecrypt);
    }
    let (nonce_bytes, ct) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadDecrypt)?;

    let plaintext = cipher
        .decrypt(nonce, Payload { msg: ct, aad })
        .map_err(|_| CryptoError::AeadDecrypt)?;

    Ok(Zeroizing::new(plaintext))
}

/// Wrap a data key under a PIN-derived wrapping key (key transport).
/// A fresh nonce is generated internally on every call.
pub fn wrap_key(
    wrapping: &crate::kdf::WrappingKey,
    dek: &DataKey,
) -> Result<Vec<u8>, CryptoError> {
    seal(&wrapping.0, &dek.0, KEY_WRAP_AAD)
}

/// Unwrap a wrapped data key. Fails closed on tag mismatch — a wrong PIN
/// and a tampered blob are indistinguishable here.
pub fn unwrap_key(
    wrapping: &crate::kdf::WrappingKey,
    wrapped: &[u8],
) -> Result<DataKey, CryptoError> {
    let plaintext = open(&wrapping.0, wrapped, KEY_WRAP_AAD)?;
    DataKey::from_bytes(&plaintext)
}

/// Encrypt a record payload under the session's data key.
pub fn encrypt(dek: &DataKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    seal(&dek.0, plaintext, RECORD_AAD)
}

/// Decrypt a record blob (nonce || ciphertext+tag). Fails closed.
pub fn decrypt(dek: &DataKey, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    open(&dek.0, blob, RECORD_AAD)
}
