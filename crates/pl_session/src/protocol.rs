//! Provisioning and renewal handshakes with the key authority.
//!
//! Both end in a single identity-row upsert, so the store never holds a
//! half-provisioned identity. Neither retries: a transport failure surfaces
//! as-is and the caller decides (renewal carries PIN-proof semantics that
//! must not be silently repeated).

use tracing::info;

use pl_crypto::aead::{self, DataKey};
use pl_crypto::kdf;
use pl_proto::KeyAuthority;
use pl_store::{IdentityRecord, Store};

use crate::error::SessionError;

fn validate(username: &str, pin: &str) -> Result<(), SessionError> {
    if username.is_empty() {
        return Err(SessionError::Validation("username must not be empty".into()));
    }
    if pin.is_empty() {
        return Err(SessionError::Validation("pin must not be empty".into()));
    }
    Ok(())
}

async fn derive_off_thread(
    pin: &str,
    salt: [u8; kdf::SALT_LEN],
) -> Result<kdf::WrappingKey, SessionError> {
    let pin = pin.to_string();
    tokio::task::spawn_blocking(move || kdf::derive_wrapping_key(&pin, &salt))
        .await
        .map_err(|e| SessionError::Crypto(pl_crypto::CryptoError::KeyDerivation(e.to_string())))
}

/// One-time setup of an identity on this device: obtain the first data key
/// from the authority, wrap it under the PIN, persist salt + wrapped key +
/// expiry as a unit. Nothing is persisted on failure.
///
/// Refuses an already-provisioned identity — overwriting would orphan every
/// record encrypted under the existing key. Re-keying goes through [`renew`].
pub async fn provision<S, A>(
    store: &S,
    authority: &A,
    username: &str,
    pin: &str,
) -> Result<(), SessionError>
where
    S: Store,
    A: KeyAuthority,
{
    validate(username, pin)?;
    if store.get_identity(username).await?.is_some() {
        return Err(SessionError::AlreadyProvisioned);
    }

    let salt = kdf::generate_salt();
    let issued = authority.request_provisioning(username).await?;
    let wrapping = derive_off_thread(pin, salt).await?;
    let dek = DataKey::from_bytes(&issued.key[..])?;
    let wrapped = aead::wrap_key(&wrapping, &dek)?;

    store
        .put_identity(IdentityRecord::new(username, &salt, &wrapped, issued.expires_at))
        .await?;
    info!(username, expires_at = %issued.expires_at, "identity provisioned");
    Ok(())
}

/// Replace an expiring data key with a freshly issued one, same PIN, same
/// salt. Hard cutover: the old wrapped key is overwritten and records
/// written under the old key stay on disk undecryptable until the
/// application re-writes them.
///
/// The PIN is proven twice: locally, by unwrapping the current wrapped key
/// (so a wrong PIN fails before any network call), and to the authority via
/// the salt-keyed proof token.
pub async fn renew<S, A>(
    store: &S,
    authority: &A,
    username: &str,
    pin: &str,
) -> Result<(), SessionError>
where
    S: Store,
    A: KeyAuthority,
{
    validate(username, pin)?;
    let identity = store
        .get_identity(username)
        .await?
        .ok_or(SessionError::NotProvisioned)?;
    let salt = identity.salt()?;
    let wrapped = identity.wrapped_key()?;

    let wrapping = derive_off_thread(pin, salt).await?;
    let old_dek = aead::unwrap_key(&wrapping, &wrapped)?;
    drop(old_dek); // hard cutover: the outgoing key is discarded, not kept

    let proof = kdf::pin_proof(pin, &salt);
    let issued = authority.request_renewal(username, &proof).await?;
    let dek = DataKey::from_bytes(&issued.key[..])?;
    let new_wrapped = aead::wrap_key(&wrapping, &dek)?;

    store
        .put_identity(IdentityRecord::new(
            username,
            &salt,
            &new_wrapped,
            issued.expires_at,
        ))
        .await?;
    info!(username, expires_at = %issued.expires_at, "data key renewed");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use zeroize::Zeroizing;

    use pl_proto::{AuthorityError, IssuedKey};
    use pl_store::MemoryStore;

    use crate::session::{Session, UnlockStatus};

    pub(crate) const PIN: &str = "123456";

    /// Scripted authority: hands out pre-seeded keys in order and records
    /// the proofs it saw.
    pub(crate) struct TestAuthority {
        keys: Mutex<VecDeque<[u8; 32]>>,
        expires_at: DateTime<Utc>,
        pub proofs: Mutex<Vec<String>>,
    }

    impl TestAuthority {
        pub fn new(keys: Vec<[u8; 32]>, expires_at: DateTime<Utc>) -> Self {
            Self {
                keys: Mutex::new(keys.into()),
                expires_at,
                proofs: Mutex::new(Vec::new()),
            }
        }

        fn issue(&self) -> Result<IssuedKey, AuthorityError> {
            let key = self.keys.lock().unwrap().pop_front().ok_or_else(|| {
                AuthorityError::Rejected {
                    status: 409,
                    message: "no more keys scripted".into(),
                }
            })?;
            Ok(IssuedKey {
                key: Zeroizing::new(key),
                expires_at: self.expires_at,
            })
        }
    }

    #[async_trait]
    impl KeyAuthority for TestAuthority {
        async fn request_provisioning(&self, _username: &str) -> Result<IssuedKey, AuthorityError> {
            self.issue()
        }

        async fn request_renewal(
            &self,
            _username: &str,
            pin_proof: &str,
        ) -> Result<IssuedKey, AuthorityError> {
            self.proofs.lock().unwrap().push(pin_proof.to_string());
            self.issue()
        }
    }

    /// MemoryStore with `username` provisioned under [`PIN`], key valid for
    /// 30 days.
    pub(crate) async fn provisioned_store(username: &str) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let authority = TestAuthority::new(vec![[1u8; 32]], Utc::now() + Duration::days(30));
        provision(store.as_ref(), &authority, username, PIN)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn provision_persists_a_complete_identity() {
        let store = MemoryStore::new();
        let authority = TestAuthority::new(vec![[1u8; 32]], Utc::now() + Duration::days(30));
        provision(&store, &authority, "alice", PIN).await.unwrap();

        let row = store.get_identity("alice").await.unwrap().unwrap();
        assert_eq!(row.salt().unwrap().len(), kdf::SALT_LEN);
        assert!(!row.wrapped_key().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provision_rejects_existing_identity() {
        let store = provisioned_store("alice").await;
        let authority = TestAuthority::new(vec![[2u8; 32]], Utc::now() + Duration::days(30));
        assert!(matches!(
            provision(store.as_ref(), &authority, "alice", PIN).await,
            Err(SessionError::AlreadyProvisioned)
        ));
    }

    #[tokio::test]
    async fn provision_validates_inputs() {
        let store = MemoryStore::new();
        let authority = TestAuthority::new(vec![], Utc::now());
        assert!(matches!(
            provision(&store, &authority, "", PIN).await,
            Err(SessionError::Validation(_))
        ));
        assert!(matches!(
            provision(&store, &authority, "alice", "").await,
            Err(SessionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn provision_aborts_cleanly_on_authority_failure() {
        let store = MemoryStore::new();
        let authority = TestAuthority::new(vec![], Utc::now()); // will refuse
        assert!(matches!(
            provision(&store, &authority, "alice", PIN).await,
            Err(SessionError::Authority(_))
        ));
        // Nothing partial persisted — unlock still reports not provisioned.
        assert!(store.get_identity("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn renewal_is_a_hard_cutover() {
        let store = Arc::new(MemoryStore::new());
        let authority =
            TestAuthority::new(vec![[1u8; 32], [2u8; 32]], Utc::now() + Duration::days(30));
        provision(store.as_ref(), &authority, "alice", PIN)
            .await
            .unwrap();

        // Write a record under K1.
        let session = Session::new(store.clone(), "alice");
        session.unlock(PIN).await.unwrap();
        session.write("r1", b"under-k1").await.unwrap();
        session.lock().await;

        let before = store.get_identity("alice").await.unwrap().unwrap();
        renew(store.as_ref(), &authority, "alice", PIN).await.unwrap();
        let after = store.get_identity("alice").await.unwrap().unwrap();

        // Same salt, new wrapped key; the authority saw the PIN proof.
        assert_eq!(before.salt_hex, after.salt_hex);
        assert_ne!(before.wrapped_key_b64, after.wrapped_key_b64);
        assert_eq!(
            authority.proofs.lock().unwrap().as_slice(),
            &[kdf::pin_proof(PIN, &before.salt().unwrap())]
        );

        // Same PIN now recovers K2: old records no longer decrypt (expected,
        // not a bug), new writes round-trip.
        session.unlock(PIN).await.unwrap();
        assert!(matches!(
            session.read("r1").await,
            Err(SessionError::AuthenticationFailure)
        ));
        session.write("r2", b"under-k2").await.unwrap();
        assert_eq!(&*session.read("r2").await.unwrap(), b"under-k2");
    }

    #[tokio::test]
    async fn renewal_with_wrong_pin_never_reaches_the_authority() {
        let store = provisioned_store("alice").await;
        let authority = TestAuthority::new(vec![[9u8; 32]], Utc::now() + Duration::days(30));
        assert!(matches!(
            renew(store.as_ref(), &authority, "alice", "654321").await,
            Err(SessionError::AuthenticationFailure)
        ));
        assert!(authority.proofs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn renewal_requires_provisioned_identity() {
        let store = MemoryStore::new();
        let authority = TestAuthority::new(vec![[9u8; 32]], Utc::now());
        assert!(matches!(
            renew(&store, &authority, "alice", PIN).await,
            Err(SessionError::NotProvisioned)
        ));
    }

    #[tokio::test]
    async fn expired_key_still_unlocks_but_reports_it() {
        let store = Arc::new(MemoryStore::new());
        let authority = TestAuthority::new(vec![[1u8; 32]], Utc::now() - Duration::hours(1));
        provision(store.as_ref(), &authority, "alice", PIN)
            .await
            .unwrap();

        let session = Session::new(store, "alice");
        let status = session.unlock(PIN).await.unwrap();
        assert_eq!(status, UnlockStatus::KeyExpired);
        // Offline data stays reachable.
        session.write("r1", b"still-usable").await.unwrap();
        assert_eq!(&*session.read("r1").await.unwrap(), b"still-usable");
    }
}
