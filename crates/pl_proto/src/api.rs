//! API request/response types shared with the key authority.
//! These map directly to JSON bodies on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ProvisionKeyRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewKeyRequest {
    pub username: String,
    /// HMAC-SHA256(salt, pin), base64url. Registered at provisioning time;
    /// the authority refuses renewal when it does not match.
    pub pin_proof: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedKeyResponse {
    /// Base64url raw data key (32 bytes).
    pub data_key: String,
    /// Absolute time after which this key counts as stale.
    pub expires_at: DateTime<Utc>,
}
