//! pl_proto — Pinlock key-authority protocol
//!
//! The remote authority issues and re-issues the data-encryption key. This
//! crate holds the JSON wire types, the abstract [`KeyAuthority`] contract
//! the session layer programs against, and the production HTTP client.
//!
//! Transport authentication (the bearer session) is established out of band;
//! this crate only carries it.

pub mod api;
pub mod authority;
pub mod error;

pub use authority::{HttpAuthority, IssuedKey, KeyAuthority};
pub use error::AuthorityError;
