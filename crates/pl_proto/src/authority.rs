//! Abstract key-authority contract + HTTP implementation.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::api::{IssuedKeyResponse, ProvisionKeyRequest, RenewKeyRequest};
use crate::error::AuthorityError;

pub const DATA_KEY_LEN: usize = 32;

/// Decoded, validated form of an [`IssuedKeyResponse`].
pub struct IssuedKey {
    /// Raw 32-byte data key. Zeroized on drop.
    pub key: Zeroizing<[u8; DATA_KEY_LEN]>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<IssuedKeyResponse> for IssuedKey {
    type Error = AuthorityError;

    fn try_from(res: IssuedKeyResponse) -> Result<Self, AuthorityError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&res.data_key)
            .map_err(|e| AuthorityError::InvalidKeyMaterial(e.to_string()))?;
        let key: [u8; DATA_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            AuthorityError::InvalidKeyMaterial(format!(
                "expected {DATA_KEY_LEN} key bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
            expires_at: res.expires_at,
        })
    }
}

/// What the session layer needs from the remote authority. No retries, no
/// internal timeouts — failures surface to the caller as typed errors.
#[async_trait]
pub trait KeyAuthority: Send + Sync {
    /// One-time issue of the first data key for an identity. The caller is
    /// already authenticated through the transport's side channel.
    async fn request_provisioning(&self, username: &str) -> Result<IssuedKey, AuthorityError>;

    /// Re-issue a brand-new data key (unrelated to the old one). Requires a
    /// PIN-possession proof; the authority must refuse without it.
    async fn request_renewal(
        &self,
        username: &str,
        pin_proof: &str,
    ) -> Result<IssuedKey, AuthorityError>;
}

/// Production client for the key-authority HTTP API.
#[derive(Clone)]
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpAuthority {
    pub fn new(base_url: &str, bearer_token: &str) -> Result<Self, AuthorityError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent("pinlock-client/0.1")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: bearer_token.to_string(),
        })
    }

    async fn post_for_key<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<IssuedKey, AuthorityError> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body: serde_json::Value = res.json().await.unwrap_or_default();
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("key authority refused the request")
                .to_string();
            warn!(%status, path, "key authority rejected request");
            return Err(AuthorityError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: IssuedKeyResponse = res.json().await?;
        parsed.try_into()
    }
}

#[async_trait]
impl KeyAuthority for HttpAuthority {
    async fn request_provisioning(&self, username: &str) -> Result<IssuedKey, AuthorityError> {
        info!(username, "requesting provisioning key");
        self.post_for_key(
            "/api/keys/provision",
            &ProvisionKeyRequest {
                username: username.to_string(),
            },
        )
        .await
    }

    async fn request_renewal(
        &self,
        username: &str,
        pin_proof: &str,
    ) -> Result<IssuedKey, AuthorityError> {
        info!(username, "requesting key renewal");
        self.post_for_key(
            "/api/keys/renew",
            &RenewKeyRequest {
                username: username.to_string(),
                pin_proof: pin_proof.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_key_rejects_short_material() {
        let res = IssuedKeyResponse {
            data_key: URL_SAFE_NO_PAD.encode([0u8; 16]),
            expires_at: Utc::now(),
        };
        assert!(matches!(
            IssuedKey::try_from(res),
            Err(AuthorityError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn issued_key_accepts_32_bytes() {
        let res = IssuedKeyResponse {
            data_key: URL_SAFE_NO_PAD.encode([5u8; DATA_KEY_LEN]),
            expires_at: Utc::now(),
        };
        let issued = IssuedKey::try_from(res).unwrap();
        assert_eq!(*issued.key, [5u8; DATA_KEY_LEN]);
    }

    #[test]
    fn base_url_trailing_slash_is_normalised() {
        let authority = HttpAuthority::new("https://authority.example/", "token").unwrap();
        assert_eq!(authority.base_url, "https://authority.example");
    }
}
