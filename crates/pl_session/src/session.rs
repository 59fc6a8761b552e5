//! Per-identity session state machine.
//!
//! Locked is the initial and resting state; Unlocked holds the unwrapped
//! data key in memory until `lock()` drops it (zeroized on drop). The key is
//! private to one `Session` instance and reachable only through its methods.
//! Distinct identities are distinct instances over a shared store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use zeroize::Zeroizing;

use pl_crypto::aead::{self, DataKey};
use pl_crypto::kdf;
use pl_store::{EncryptedRecord, Store};

use crate::error::SessionError;

/// Outcome of a successful unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockStatus {
    Active,
    /// The data key's validity window has passed. The session still unlocks
    /// (offline data stays reachable) but the caller should route to the
    /// renewal flow.
    KeyExpired,
}

struct SessionInner {
    dek: DataKey,
    expires_at: DateTime<Utc>,
}

/// Clone to share one identity's session across tasks; clones observe the
/// same lock state.
pub struct Session<S: Store> {
    store: Arc<S>,
    username: String,
    inner: Arc<RwLock<Option<SessionInner>>>,
    /// Serialises unlock attempts for this identity. Concurrent unlocks with
    /// different PINs racing the store read are undefined otherwise.
    unlock_gate: Arc<Mutex<()>>,
}

// Manual impl: the store sits behind an Arc, so no `S: Clone` bound.
impl<S: Store> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            username: self.username.clone(),
            inner: self.inner.clone(),
            unlock_gate: self.unlock_gate.clone(),
        }
    }
}

impl<S: Store> Session<S> {
    pub fn new(store: Arc<S>, username: &str) -> Self {
        Self {
            store,
            username: username.to_string(),
            inner: Arc::new(RwLock::new(None)),
            unlock_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Locked → Unlocked. Fails closed: on any error the state stays Locked
    /// and no partial key material is retained.
    ///
    /// The PBKDF2 derivation runs on the blocking pool; it is not
    /// cancellable mid-flight.
    pub async fn unlock(&self, pin: &str) -> Result<UnlockStatus, SessionError> {
        let _gate = self.unlock_gate.lock().await;

        let identity = self
            .store
            .get_identity(&self.username)
            .await?
            .ok_or(SessionError::NotProvisioned)?;
        let salt = identity.salt()?;
        let wrapped = identity.wrapped_key()?;

        let pin = pin.to_string();
        let wrapping = tokio::task::spawn_blocking(move || kdf::derive_wrapping_key(&pin, &salt))
            .await
            .map_err(|e| SessionError::Crypto(pl_crypto::CryptoError::KeyDerivation(e.to_string())))?;

        let dek = aead::unwrap_key(&wrapping, &wrapped).map_err(|e| {
            warn!(username = %self.username, "unlock failed");
            SessionError::from(e)
        })?;

        let status = if Utc::now() >= identity.expires_at {
            UnlockStatus::KeyExpired
        } else {
            UnlockStatus::Active
        };

        *self.inner.write().await = Some(SessionInner {
            dek,
            expires_at: identity.expires_at,
        });
        info!(username = %self.username, ?status, "session unlocked");
        Ok(status)
    }

    /// Unlocked → Locked. Unconditional; the data key is dropped and
    /// zeroized.
    pub async fn lock(&self) {
        *self.inner.write().await = None;
        info!(username = %self.username, "session locked");
    }

    pub async fn is_locked(&self) -> bool {
        self.inner.read().await.is_none()
    }

    /// Expiry of the currently held data key, if unlocked.
    pub async fn key_expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.as_ref().map(|inner| inner.expires_at)
    }

    /// Fetch and decrypt one record. `SessionLocked` when locked.
    pub async fn read(&self, record_id: &str) -> Result<Zeroizing<Vec<u8>>, SessionError> {
        let guard = self.inner.read().await;
        let inner = guard.as_ref().ok_or(SessionError::SessionLocked)?;

        let record = self
            .store
            .get_record(&self.username, record_id)
            .await?
            .ok_or_else(|| SessionError::RecordNotFound(record_id.to_string()))?;
        Ok(aead::decrypt(&inner.dek, &record.blob()?)?)
    }

    /// Encrypt and persist one record. `SessionLocked` when locked.
    pub async fn write(&self, record_id: &str, plaintext: &[u8]) -> Result<(), SessionError> {
        let guard = self.inner.read().await;
        let inner = guard.as_ref().ok_or(SessionError::SessionLocked)?;

        let blob = aead::encrypt(&inner.dek, plaintext)?;
        self.store
            .put_record(EncryptedRecord::new(&self.username, record_id, &blob))
            .await?;
        Ok(())
    }
}
