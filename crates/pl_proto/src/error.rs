use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Key authority rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Key authority returned invalid key material: {0}")]
    InvalidKeyMaterial(String),
}
