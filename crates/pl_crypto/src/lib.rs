//! pl_crypto — Pinlock cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Public APIs return opaque newtypes so raw key bytes never circulate.
//!
//! # Module layout
//! - `kdf`   — PBKDF2-HMAC-SHA256 wrapping-key derivation + PIN proof
//! - `aead`  — AES-256-GCM key wrap / record encryption helpers
//! - `error` — unified error type

pub mod aead;
pub mod error;
pub mod kdf;

pub use error::CryptoError;
