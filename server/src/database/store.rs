use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use shared::types::{SessionKey, SessionRecord};

/// Default bound on every store round-trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session not found")]
    NotFound,

    #[error("session store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("session store error: {0}")]
    Backend(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Key/value contract the gate needs from a session backend.
///
/// Implementations do not have to bound their own latency;
/// [`SessionStoreHandle`] applies the timeout around every call.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite the record stored under `key`.
    async fn put(&self, key: &SessionKey, record: &SessionRecord) -> Result<(), StoreError>;

    /// Fetch the record under `key`; [`StoreError::NotFound`] when absent.
    async fn get(&self, key: &SessionKey) -> Result<SessionRecord, StoreError>;

    /// Remove the record under `key`; [`StoreError::NotFound`] when absent.
    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError>;
}

/// Shared, timeout-bounded handle to a [`SessionStore`].
///
/// Cheap to clone. Dropping a pending call drops the backend future with it,
/// so a cancelled request never leaves a store call running in the background.
#[derive(Clone)]
pub struct SessionStoreHandle {
    store: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl SessionStoreHandle {
    pub fn new(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn put(&self, key: &SessionKey, record: &SessionRecord) -> Result<(), StoreError> {
        self.bounded(self.store.put(key, record)).await
    }

    pub async fn get(&self, key: &SessionKey) -> Result<SessionRecord, StoreError> {
        self.bounded(self.store.get(key)).await
    }

    pub async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.bounded(self.store.delete(key)).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

impl std::fmt::Debug for SessionStoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStoreHandle")
            .field("timeout", &self.timeout)
            .finish()
    }
}
