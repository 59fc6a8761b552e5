//! pl_session — Pinlock session-unlock engine
//!
//! Ties the pieces together: a per-identity [`Session`] recovers the data
//! key from the store with the user's PIN and exposes encrypted record
//! read/write while unlocked; [`provision`] and [`renew`] run the key
//! handshakes against the remote authority.
//!
//! # Key hierarchy
//! PIN + salt → wrapping key (PBKDF2, memory-only) → unwraps the
//! authority-issued data key (persisted only in wrapped form) → encrypts
//! records. Nothing at rest recovers plaintext without the PIN.

pub mod error;
pub mod protocol;
pub mod session;

pub use error::SessionError;
pub use protocol::{provision, renew};
pub use session::{Session, UnlockStatus};
