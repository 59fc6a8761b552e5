//! The store contract the session layer programs against.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{EncryptedRecord, IdentityRecord};

/// Key-value persistence over the two logical tables. Single-key put/get
/// only — no transactions are assumed beyond one row landing atomically, and
/// no retries happen here (the caller decides).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_identity(&self, username: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Upsert. Salt, wrapped key and expiry land as one row, so a reader can
    /// never observe a half-provisioned identity.
    async fn put_identity(&self, identity: IdentityRecord) -> Result<(), StoreError>;

    async fn get_record(
        &self,
        username: &str,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StoreError>;

    async fn put_record(&self, record: EncryptedRecord) -> Result<(), StoreError>;
}
