//! pl_store — Pinlock persistent store
//!
//! Two logical tables, both opaque to this crate's callers' secrets:
//! - `identities` keyed by username → {salt, wrapped data key, expiry}.
//!   The salt is hex text, the wrapped key base64url text; neither is
//!   usable without the PIN, so the store never sees plaintext key material.
//! - `records` keyed by (username, record id) → AEAD blob, base64url text.
//!
//! [`Store`] is the seam the session layer programs against. `SqliteStore`
//! is the production implementation (sqlx, WAL, embedded migrations);
//! `MemoryStore` backs tests.

pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod store;

pub use db::SqliteStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{EncryptedRecord, IdentityRecord};
pub use store::Store;
