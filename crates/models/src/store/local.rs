//! In-process document store speaking the same primitives as the hosted one.
//!
//! Documents live in a `BTreeMap` per base, so fetches come back in key
//! order with a key cursor. When opened with a file path the whole store is
//! rewritten as JSON after every mutation.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::query::Query;
use super::{document_key, Document, DocumentStore, FetchPage, StoreSession};
use crate::errors::StoreError;

type Bases = HashMap<String, BTreeMap<String, Document>>;

#[derive(Default)]
struct Inner {
    bases: RwLock<Bases>,
    file_path: Option<PathBuf>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load (or create) a JSON-file-backed store.
    pub async fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let file_path = path.as_ref().to_path_buf();
        common::env::ensure_parent_dir(&file_path)?;

        let bases: Bases = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Bases::new();
                let data = serde_json::to_vec(&empty).map_err(|e| StoreError::Decode(e.to_string()))?;
                fs::write(&file_path, data).await?;
                empty
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                bases: RwLock::new(bases),
                file_path: Some(file_path),
                ..Inner::default()
            }),
        })
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    pub fn sessions_closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored in `base`.
    pub async fn len(&self, base: &str) -> usize {
        self.inner.bases.read().await.get(base).map_or(0, BTreeMap::len)
    }

    /// Store a document bypassing every check, e.g. to seed a malformed one.
    pub async fn insert_raw(&self, base: &str, key: &str, document: Document) {
        let mut bases = self.inner.bases.write().await;
        bases.entry(base.to_string()).or_default().insert(key.to_string(), document);
    }

    async fn persist(&self, bases: &Bases) -> Result<(), StoreError> {
        if let Some(path) = &self.inner.file_path {
            let data = serde_json::to_vec(bases).map_err(|e| StoreError::Decode(e.to_string()))?;
            fs::write(path, data).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn open(&self, base: &str) -> Result<Box<dyn StoreSession>, StoreError> {
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LocalSession { store: self.clone(), base: base.to_string() }))
    }
}

struct LocalSession {
    store: LocalStore,
    base: String,
}

#[async_trait]
impl StoreSession for LocalSession {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let bases = self.store.inner.bases.read().await;
        Ok(bases.get(&self.base).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, document: Document) -> Result<Document, StoreError> {
        if !document.is_object() {
            return Err(StoreError::Rejected("document must be a JSON object".into()));
        }
        let key = document_key(&document)
            .ok_or_else(|| StoreError::Rejected("document needs a string key".into()))?
            .to_string();

        let mut bases = self.store.inner.bases.write().await;
        bases.entry(self.base.clone()).or_default().insert(key.clone(), document.clone());
        self.store.persist(&bases).await?;
        debug!(base = %self.base, %key, "local put");
        Ok(document)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut bases = self.store.inner.bases.write().await;
        let removed = bases.get_mut(&self.base).and_then(|b| b.remove(key)).is_some();
        if removed {
            self.store.persist(&bases).await?;
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query, limit: usize, last: Option<&str>) -> Result<FetchPage, StoreError> {
        let bases = self.store.inner.bases.read().await;
        let Some(base) = bases.get(&self.base) else {
            return Ok(FetchPage::default());
        };
        let lower = match last {
            Some(cursor) => Bound::Excluded(cursor.to_string()),
            None => Bound::Unbounded,
        };

        let mut matching = base
            .range((lower, Bound::Unbounded))
            .filter(|(_, doc)| query.matches(doc));
        let items: Vec<Document> = matching.by_ref().take(limit).map(|(_, doc)| doc.clone()).collect();
        let more = matching.next().is_some();
        let last = if more && !items.is_empty() {
            items.last().and_then(document_key).map(str::to_string)
        } else {
            None
        };
        Ok(FetchPage { items, last })
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.store.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded(n: usize) -> (LocalStore, Box<dyn StoreSession>) {
        let store = LocalStore::in_memory();
        let session = store.open("things").await.unwrap();
        for i in 0..n {
            session
                .put(json!({ "key": format!("k{i:02}"), "n": i, "even": i % 2 == 0 }))
                .await
                .unwrap();
        }
        (store, session)
    }

    #[tokio::test]
    async fn get_put_delete() {
        let (store, session) = seeded(1).await;
        assert_eq!(session.get("k00").await.unwrap().unwrap()["n"], 0);
        assert!(session.get("nope").await.unwrap().is_none());
        session.delete("k00").await.unwrap();
        session.delete("k00").await.unwrap();
        assert_eq!(store.len("things").await, 0);
    }

    #[tokio::test]
    async fn put_requires_string_key() {
        let (_, session) = seeded(0).await;
        assert!(session.put(json!({ "n": 1 })).await.is_err());
        assert!(session.put(json!([1, 2])).await.is_err());
    }

    #[tokio::test]
    async fn fetch_pages_with_cursor() {
        let (_, session) = seeded(5).await;
        let first = session.fetch(&Query::all(), 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.last.as_deref(), Some("k01"));

        let second = session.fetch(&Query::all(), 2, first.last.as_deref()).await.unwrap();
        assert_eq!(second.items[0]["key"], "k02");
        let third = session.fetch(&Query::all(), 2, second.last.as_deref()).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.last.is_none());
    }

    #[tokio::test]
    async fn fetch_exact_page_has_no_cursor() {
        let (_, session) = seeded(4).await;
        let page = session.fetch(&Query::all(), 4, None).await.unwrap();
        assert_eq!(page.items.len(), 4);
        assert!(page.last.is_none());
    }

    #[tokio::test]
    async fn fetch_applies_query() {
        let (_, session) = seeded(6).await;
        let page = session.fetch(&Query::all().eq("even", true), 10, None).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.items.iter().all(|d| d["even"] == json!(true)));
    }

    #[tokio::test]
    async fn unknown_base_is_empty() {
        let store = LocalStore::in_memory();
        let session = store.open("empty").await.unwrap();
        let page = session.fetch(&Query::all(), 10, None).await.unwrap();
        assert!(page.items.is_empty());
        session.close().await.unwrap();
        assert_eq!(store.sessions_opened(), 1);
        assert_eq!(store.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn file_store_survives_reload() -> Result<(), anyhow::Error> {
        let path = std::env::temp_dir().join(format!("carto_local_{}.json", uuid::Uuid::new_v4()));
        let store = LocalStore::open_file(&path).await?;
        let session = store.open("features").await?;
        session.put(json!({ "key": "a", "v": 1 })).await?;
        session.put(json!({ "key": "b", "v": 2 })).await?;
        session.delete("b").await?;

        let reloaded = LocalStore::open_file(&path).await?;
        assert_eq!(reloaded.len("features").await, 1);
        let s = reloaded.open("features").await?;
        assert_eq!(s.get("a").await?.unwrap()["v"], 1);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }
}
