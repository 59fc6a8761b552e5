//! End-to-end scenario over the SQLite store: provision, unlock, write,
//! lock, re-unlock, renew.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::tempdir;
use zeroize::Zeroizing;

use pl_proto::{AuthorityError, IssuedKey, KeyAuthority};
use pl_session::{provision, renew, Session, SessionError, UnlockStatus};
use pl_store::SqliteStore;

const PIN: &str = "123456";

struct ScriptedAuthority {
    keys: Mutex<Vec<[u8; 32]>>,
}

#[async_trait]
impl KeyAuthority for ScriptedAuthority {
    async fn request_provisioning(&self, _username: &str) -> Result<IssuedKey, AuthorityError> {
        self.next()
    }

    async fn request_renewal(
        &self,
        _username: &str,
        _pin_proof: &str,
    ) -> Result<IssuedKey, AuthorityError> {
        self.next()
    }
}

impl ScriptedAuthority {
    fn new(keys: Vec<[u8; 32]>) -> Self {
        Self {
            keys: Mutex::new(keys),
        }
    }

    fn next(&self) -> Result<IssuedKey, AuthorityError> {
        let mut keys = self.keys.lock().unwrap();
        if keys.is_empty() {
            return Err(AuthorityError::Rejected {
                status: 503,
                message: "authority unavailable".into(),
            });
        }
        Ok(IssuedKey {
            key: Zeroizing::new(keys.remove(0)),
            expires_at: Utc::now() + Duration::days(30),
        })
    }
}

#[tokio::test]
async fn full_lifecycle_against_sqlite() {
    let dir = tempdir().unwrap();
    let store = Arc::new(
        SqliteStore::open(&dir.path().join("pinlock.db"))
            .await
            .unwrap(),
    );
    let authority = ScriptedAuthority::new(vec![[11u8; 32], [22u8; 32]]);

    provision(store.as_ref(), &authority, "alice", PIN)
        .await
        .unwrap();

    let session = Session::new(store.clone(), "alice");
    assert_eq!(session.unlock(PIN).await.unwrap(), UnlockStatus::Active);
    session.write("r1", b"secret").await.unwrap();
    assert_eq!(&*session.read("r1").await.unwrap(), b"secret");

    session.lock().await;
    assert!(matches!(
        session.read("r1").await,
        Err(SessionError::SessionLocked)
    ));

    // Wrong PIN against the persisted row.
    assert!(matches!(
        session.unlock("654321").await,
        Err(SessionError::AuthenticationFailure)
    ));
    assert!(session.is_locked().await);

    assert_eq!(session.unlock(PIN).await.unwrap(), UnlockStatus::Active);
    assert_eq!(&*session.read("r1").await.unwrap(), b"secret");
    session.lock().await;

    // Renew: same PIN now recovers the new key; the r1 blob stays on disk
    // but is no longer decryptable.
    renew(store.as_ref(), &authority, "alice", PIN)
        .await
        .unwrap();
    assert_eq!(session.unlock(PIN).await.unwrap(), UnlockStatus::Active);
    assert!(matches!(
        session.read("r1").await,
        Err(SessionError::AuthenticationFailure)
    ));
    session.write("r1", b"rewritten").await.unwrap();
    assert_eq!(&*session.read("r1").await.unwrap(), b"rewritten");
}
