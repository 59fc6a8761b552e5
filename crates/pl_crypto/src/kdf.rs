//! Key derivation
//!
//! `derive_wrapping_key` — PBKDF2-HMAC-SHA256, stretches a short user PIN
//!   plus a per-identity salt into the 32-byte key that wraps the data key.
//!
//! `pin_proof` — HMAC-SHA256 token sent to the key authority on renewal as
//!   proof of PIN possession. The PIN itself is never transmitted.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

pub const SALT_LEN: usize = 16;

/// Fixed iteration count. Raising it is a local tuning decision, but any
/// change makes previously wrapped material underivable without re-wrapping.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// 32-byte wrap/unwrap key derived from the user PIN. Zeroized on drop.
/// Only the codec functions in [`crate::aead`] can touch the raw bytes;
/// it is never persisted and never used for bulk encryption.
#[derive(ZeroizeOnDrop)]
pub struct WrappingKey(pub(crate) [u8; 32]);

/// Derive a wrapping key from a PIN + 16-byte salt.
///
/// Deterministic: identical inputs always yield the same key. Any PIN
/// content is accepted; rejecting weak PINs is the caller's policy call.
/// CPU-heavy by design — run via `spawn_blocking` (or equivalent), never on
/// an interactive path.
pub fn derive_wrapping_key(pin: &str, salt: &[u8; SALT_LEN]) -> WrappingKey {
    let mut output = [0u8; 32];
    pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut output);
    WrappingKey(output)
}

/// Validate an untyped salt slice (e.g., decoded from a stored row).
pub fn salt_from_slice(bytes: &[u8]) -> Result<[u8; SALT_LEN], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidSalt {
        expected: SALT_LEN,
        actual: bytes.len(),
    })
}

/// Generate a fresh random 16-byte salt (once per provisioned identity; store
/// it alongside the wrapped key — it is not secret).
pub fn generate_salt() -> [u8; SALT_LEN] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Proof-of-PIN-possession token for the renewal handshake: HMAC-SHA256
/// keyed by the identity's salt over the PIN bytes, base64url. The authority
/// records this value at provisioning and compares on renewal.
pub fn pin_proof(pin: &str, salt: &[u8; SALT_LEN]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(salt)
        .expect("HMAC accepts any key length");
    mac.update(pin.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}
