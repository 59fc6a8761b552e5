//! In-memory store for tests and ephemeral profiles.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{EncryptedRecord, IdentityRecord};
use crate::store::Store;

#[derive(Default)]
pub struct MemoryStore {
    identities: RwLock<HashMap<String, IdentityRecord>>,
    records: RwLock<HashMap<(String, String), EncryptedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_identity(&self, username: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.identities.read().await.get(username).cloned())
    }

    async fn put_identity(&self, identity: IdentityRecord) -> Result<(), StoreError> {
        self.identities
            .write()
            .await
            .insert(identity.username.clone(), identity);
        Ok(())
    }

    async fn get_record(
        &self,
        username: &str,
        record_id: &str,
    ) -> Result<Option<EncryptedRecord>, StoreError> {
        let key = (username.to_string(), record_id.to_string());
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn put_record(&self, record: EncryptedRecord) -> Result<(), StoreError> {
        let key = (record.username.clone(), record.record_id.clone());
        self.records.write().await.insert(key, record);
        Ok(())
    }
}
