use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shared::types::{SessionKey, SessionRecord};

use crate::database::store::{SessionStore, StoreError};

/// In-process session store.
///
/// Suitable for tests and single-instance deployments; sessions do not
/// survive a restart.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.read().await.contains_key(key.as_str())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, key: &SessionKey, record: &SessionRecord) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(key.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<SessionRecord, StoreError> {
        self.sessions
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .remove(key.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
