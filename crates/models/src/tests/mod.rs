

/// Deta HTTP client against a mock server
pub mod deta_client_tests;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::feature::{Category, Feature};
use crate::record::{RecordConfig, Repository};
use crate::store::query::Query;
use crate::store::{Document, DocumentStore, FetchPage, LocalStore, StoreSession};

pub const BASE: &str = "features";

pub fn repo(store: &LocalStore, max_page_size: usize) -> Repository<Feature> {
    Repository::new(Arc::new(store.clone()), RecordConfig::new(BASE, max_page_size))
}

/// Save `n` features keyed `feature-00`, `feature-01`, ... named `place-NN`.
pub async fn seed(repo: &Repository<Feature>, n: usize) -> Vec<Feature> {
    let mut saved = Vec::with_capacity(n);
    for i in 0..n {
        let category = match i % 3 {
            0 => Category::Reefer,
            1 => Category::Tobacco,
            _ => Category::Other,
        };
        let mut f = Feature::new(format!("place-{i:02}"), category, i as f64, 0.0).with_key(format!("feature-{i:02}"));
        saved.push(repo.save(&mut f).await.expect("seed save"));
    }
    saved
}

/// Local store whose deletes fail for chosen keys; remembers attempted deletes.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: LocalStore,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
    pub delete_attempts: Arc<Mutex<Vec<String>>>,
}

impl FlakyStore {
    pub fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn open(&self, base: &str) -> Result<Box<dyn StoreSession>, StoreError> {
        let inner = self.inner.open(base).await?;
        Ok(Box::new(FlakySession { inner, store: self.clone() }))
    }
}

struct FlakySession {
    inner: Box<dyn StoreSession>,
    store: FlakyStore,
}

#[async_trait]
impl StoreSession for FlakySession {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, document: Document) -> Result<Document, StoreError> {
        self.inner.put(document).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete_attempts.lock().unwrap().push(key.to_string());
        if self.store.failing_deletes.lock().unwrap().contains(key) {
            return Err(StoreError::Transport("connection reset".into()));
        }
        self.inner.delete(key).await
    }

    async fn fetch(&self, query: &Query, limit: usize, last: Option<&str>) -> Result<FetchPage, StoreError> {
        self.inner.fetch(query, limit, last).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}
