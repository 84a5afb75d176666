//! Generic persistence for schema-validated records.
//!
//! `Repository<R>` implements save/update/delete/find/fetch/delete_many and
//! in-memory pagination for any [`Record`] on top of a [`DocumentStore`].
//! Every operation opens its own store session and closes it before
//! returning, whether the operation succeeded or not.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::errors::{ModelError, StoreError};
use crate::store::query::Query;
use crate::store::{Document, DocumentStore, StoreSession};

/// Default `limit` for [`Repository::fetch`] when the caller has no opinion.
pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// A persisted entity with a unique key and a version counter.
///
/// Implementors should deny unknown fields in their serde representation so
/// that stored and in-memory forms round-trip exactly.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);

    /// Field-level rules beyond what the serde schema expresses.
    fn validate(&self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Per-record-type store settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    /// Store namespace holding this record type.
    pub base_name: String,
    /// Upper bound on the page size of one fetch request.
    pub max_page_size: usize,
}

impl RecordConfig {
    pub fn new(base_name: impl Into<String>, max_page_size: usize) -> Self {
        Self { base_name: base_name.into(), max_page_size: max_page_size.max(1) }
    }

    pub fn from_store_config(cfg: &configs::StoreConfig) -> Self {
        Self::new(cfg.db_name.clone(), cfg.fetch_limit)
    }
}

/// What `find` does when the key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    Raise,
    Ignore,
}

/// Result of [`Repository::paginate`].
///
/// `total_fetched` counts what was fetched to build the page (at most
/// `limit + offset`), not every record matching the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<R> {
    pub total_fetched: usize,
    pub items: Vec<R>,
}

/// Whether the fetch loop asks the store for another page.
///
/// The loop keeps going while the accumulated count is still `<= limit`,
/// so the result may exceed `limit` by up to one page.
pub fn should_fetch_more(accumulated: usize, limit: usize, cursor: Option<&str>) -> bool {
    accumulated <= limit && cursor.is_some()
}

pub struct Repository<R> {
    store: Arc<dyn DocumentStore>,
    config: RecordConfig,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), config: self.config.clone(), _record: PhantomData }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(store: Arc<dyn DocumentStore>, config: RecordConfig) -> Self {
        Self { store, config, _record: PhantomData }
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Bump the version in place, persist, and return the stored copy.
    pub async fn save(&self, record: &mut R) -> Result<R, ModelError> {
        record.validate()?;
        record.set_version(record.version() + 1);
        let document = encode(record)?;

        let session = self.open().await?;
        let result = self.call("put", session.put(document)).await;
        self.release(session.as_ref(), "save").await;

        let stored: R = decode(result?)?;
        debug!(base = %self.config.base_name, key = %stored.key(), version = stored.version(), "record saved");
        Ok(stored)
    }

    /// Merge `fields` into a snapshot of `record`, persist it with the next
    /// version and return the stored copy. `record` itself is left as is.
    ///
    /// `fields` is applied as a JSON merge patch: nested objects merge,
    /// `null` removes a field.
    pub async fn update(&self, record: &R, fields: Map<String, Value>) -> Result<R, ModelError> {
        let mut snapshot = encode(record)?;
        merge_patch(&mut snapshot, Value::Object(fields));
        let mut next: R = serde_json::from_value(snapshot).map_err(|e| ModelError::Validation(e.to_string()))?;
        // Compared after decoding so key normalization applies to both sides.
        if next.key() != record.key() {
            return Err(ModelError::Validation("key is immutable".into()));
        }
        next.set_version(record.version() + 1);
        next.validate()?;
        let document = encode(&next)?;

        let session = self.open().await?;
        let result = self.call("put", session.put(document)).await;
        self.release(session.as_ref(), "update").await;

        let stored: R = decode(result?)?;
        debug!(base = %self.config.base_name, key = %stored.key(), version = stored.version(), "record updated");
        Ok(stored)
    }

    pub async fn delete(&self, record: &R) -> Result<(), ModelError> {
        self.delete_key(record.key()).await
    }

    pub async fn delete_key(&self, key: &str) -> Result<(), ModelError> {
        let session = self.open().await?;
        let result = self.call("delete", session.delete(key)).await;
        self.release(session.as_ref(), "delete").await;
        result?;
        debug!(base = %self.config.base_name, %key, "record deleted");
        Ok(())
    }

    /// Look a record up by key.
    ///
    /// A missing key is `NotFound` under [`OnMissing::Raise`] and `None`
    /// otherwise. A stored document that fails to deserialize is
    /// `ModelError::Schema`, never `NotFound`.
    pub async fn find(&self, key: &str, on_missing: OnMissing) -> Result<Option<R>, ModelError> {
        let session = self.open().await?;
        let result = self.call("get", session.get(key)).await;
        self.release(session.as_ref(), "find").await;

        match result? {
            Some(document) => decode(document).map(Some),
            None if on_missing == OnMissing::Raise => Err(ModelError::not_found(key)),
            None => Ok(None),
        }
    }

    /// `find` with [`OnMissing::Raise`].
    pub async fn get(&self, key: &str) -> Result<R, ModelError> {
        self.find(key, OnMissing::Raise).await?.ok_or_else(|| ModelError::not_found(key))
    }

    /// Fetch records matching `query` (all records when `None`).
    ///
    /// Pages of `min(limit, max_page_size)` are requested until
    /// [`should_fetch_more`] says stop, so the result can overshoot `limit`
    /// by up to one page. One malformed document fails the whole fetch.
    pub async fn fetch(&self, query: Option<&Query>, limit: usize) -> Result<Vec<R>, ModelError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let all = Query::all();
        let query = query.unwrap_or(&all);
        let page_size = limit.min(self.config.max_page_size);

        let session = self.open().await?;
        let result = self.fetch_pages(session.as_ref(), query, limit, page_size).await;
        self.release(session.as_ref(), "fetch").await;

        let documents = result?;
        debug!(base = %self.config.base_name, limit, page_size, fetched = documents.len(), "records fetched");
        documents.into_iter().map(decode).collect()
    }

    /// Delete records one after another. The first failure stops the loop
    /// and is returned; deletions already done stay done.
    pub async fn delete_many(&self, records: &[R]) -> Result<(), ModelError> {
        for record in records {
            self.delete(record).await?;
        }
        Ok(())
    }

    /// Fetch at least `limit + offset` records, sort everything fetched in
    /// memory by `order_by` (stable; ties keep fetch order) and return the
    /// `[offset, offset + limit)` slice. `total_fetched` is capped at
    /// `limit + offset`.
    pub async fn paginate<K, F>(
        &self,
        query: Option<&Query>,
        limit: usize,
        offset: usize,
        order_by: F,
        descending: bool,
    ) -> Result<Page<R>, ModelError>
    where
        K: Ord,
        F: Fn(&R) -> K,
    {
        let wanted = limit.saturating_add(offset);
        let mut items = self.fetch(query, wanted).await?;
        let total_fetched = items.len().min(wanted);

        if descending {
            items.sort_by(|a, b| order_by(b).cmp(&order_by(a)));
        } else {
            items.sort_by(|a, b| order_by(a).cmp(&order_by(b)));
        }
        let items = items.into_iter().skip(offset).take(limit).collect();
        Ok(Page { total_fetched, items })
    }

    async fn fetch_pages(
        &self,
        session: &dyn StoreSession,
        query: &Query,
        limit: usize,
        page_size: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let first = self.call("fetch", session.fetch(query, page_size, None)).await?;
        let mut items = first.items;
        let mut last = first.last;

        while should_fetch_more(items.len(), limit, last.as_deref()) {
            let page = self.call("fetch", session.fetch(query, page_size, last.as_deref())).await?;
            items.extend(page.items);
            last = page.last;
        }
        Ok(items)
    }

    async fn open(&self) -> Result<Box<dyn StoreSession>, ModelError> {
        self.call("open", self.store.open(&self.config.base_name)).await.map_err(ModelError::from)
    }

    async fn release(&self, session: &dyn StoreSession, op: &'static str) {
        if let Err(e) = session.close().await {
            warn!(base = %self.config.base_name, op, error = %e, "failed to close store session");
        }
    }

    /// Time one store call, count it, and log failures.
    async fn call<T, Fut>(&self, op: &'static str, fut: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = fut.await;
        common::metrics::observe_store_op(op, result.is_ok(), started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            error!(event = "store_call_failed", base = %self.config.base_name, op, error = %e, "document store call failed");
        }
        result
    }
}

/// Serialize a record into a store document.
pub fn encode<R: Serialize>(record: &R) -> Result<Document, ModelError> {
    serde_json::to_value(record).map_err(|e| ModelError::Validation(e.to_string()))
}

/// Deserialize a stored document; a mismatch is a schema error.
pub fn decode<R: DeserializeOwned>(document: Document) -> Result<R, ModelError> {
    serde_json::from_value(document).map_err(|e| ModelError::Schema(e.to_string()))
}

/// RFC 7396 merge patch.
pub fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                for (name, value) in patch {
                    if value.is_null() {
                        map.remove(&name);
                    } else {
                        merge_patch(map.entry(name).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}
