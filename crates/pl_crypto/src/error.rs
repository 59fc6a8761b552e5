use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    /// Covers both a wrong-PIN derivation and a tampered blob; the two are
    /// indistinguishable on purpose and the message must stay that way.
    #[error("AEAD decryption failed (authentication tag mismatch)")]
    AeadDecrypt,

    #[error("Salt must be exactly {expected} bytes, got {actual}")]
    InvalidSalt { expected: usize, actual: usize },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}
