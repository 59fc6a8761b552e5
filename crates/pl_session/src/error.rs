use pl_crypto::CryptoError;
use pl_proto::AuthorityError;
use pl_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Wrong PIN or tampered ciphertext — indistinguishable on purpose, and
    /// the message must never hint at which.
    #[error("Cannot unlock: authentication failed")]
    AuthenticationFailure,

    #[error("Identity is not provisioned on this device")]
    NotProvisioned,

    #[error("Identity is already provisioned; renew to replace its key")]
    AlreadyProvisioned,

    #[error("Session is locked")]
    SessionLocked,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<CryptoError> for SessionError {
    fn from(e: CryptoError) -> Self {
        match e {
            // All tag mismatches collapse into the one dual-purpose error.
            CryptoError::AeadDecrypt => SessionError::AuthenticationFailure,
            other => SessionError::Crypto(other),
        }
    }
}
