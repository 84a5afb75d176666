//! Document store client abstraction.
//!
//! A store hands out short-lived sessions scoped to one base (namespace).
//! Repositories open a session per operation and close it on every exit
//! path, so no connection outlives the call that needed it.

pub mod deta;
pub mod local;
pub mod query;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use query::Query;

pub use deta::DetaStore;
pub use local::LocalStore;

/// A JSON object as stored remotely. Always carries a string `key`.
pub type Document = Value;

/// One page of a query fetch. `last` is the cursor for the next page and is
/// absent once the result set is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchPage {
    pub items: Vec<Document>,
    pub last: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a session against `base`.
    async fn open(&self, base: &str) -> Result<Box<dyn StoreSession>, StoreError>;
}

#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Upsert; returns the document as persisted.
    async fn put(&self, document: Document) -> Result<Document, StoreError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn fetch(
        &self,
        query: &Query,
        limit: usize,
        last: Option<&str>,
    ) -> Result<FetchPage, StoreError>;

    /// Release the session. Callers invoke this once, on success and failure.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Build the store selected by configuration.
pub async fn connect(cfg: &configs::StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match cfg.backend {
        configs::StoreBackend::Deta => {
            let key = cfg
                .project_key
                .as_deref()
                .ok_or_else(|| StoreError::Rejected("missing project key".into()))?;
            let timeout = cfg.request_timeout_secs.map(Duration::from_secs);
            Ok(Arc::new(DetaStore::new(key, &cfg.endpoint, timeout)?))
        }
        configs::StoreBackend::Memory => Ok(Arc::new(LocalStore::in_memory())),
        configs::StoreBackend::File => Ok(Arc::new(LocalStore::open_file(&cfg.data_path).await?)),
    }
}

/// Key of a stored document, if it has a string one.
pub fn document_key(document: &Document) -> Option<&str> {
    document.get("key").and_then(Value::as_str)
}
