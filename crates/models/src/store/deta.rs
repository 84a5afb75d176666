//! HTTP client for a hosted Deta Base.
//!
//! Wire format:
//! - `GET    {base}/items/{key}`  -> item, 404 when absent
//! - `PUT    {base}/items`        body `{"items":[doc]}` -> `{"processed":{"items":[..]},"failed":{..}}`
//! - `DELETE {base}/items/{key}`  -> always 200
//! - `POST   {base}/query`        body `{"query":[..],"limit":n,"last":cursor}`
//!   -> `{"paging":{"size":n,"last":cursor},"items":[..]}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::query::Query;
use super::{Document, DocumentStore, FetchPage, StoreSession};
use crate::errors::StoreError;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct DetaStore {
    endpoint: String,
    project_id: String,
    project_key: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for DetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetaStore")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl DetaStore {
    /// `project_key` has the form `<project_id>_<secret>`.
    pub fn new(project_key: &str, endpoint: &str, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let project_id = project_key
            .split_once('_')
            .map(|(id, _)| id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Rejected("malformed project key".into()))?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            project_key: project_key.to_string(),
            timeout,
        })
    }

    fn base_url(&self, base: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| StoreError::Rejected(format!("bad endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Rejected("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push(&self.project_id)
            .push(base);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for DetaStore {
    async fn open(&self, base: &str) -> Result<Box<dyn StoreSession>, StoreError> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(&self.project_key)
            .map_err(|_| StoreError::Rejected("project key is not a valid header value".into()))?;
        headers.insert(API_KEY_HEADER, key);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(Box::new(DetaSession { client, base_url: self.base_url(base)? }))
    }
}

struct DetaSession {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct PutBody<'a> {
    items: [&'a Document; 1],
}

#[derive(Deserialize)]
struct PutResponse {
    #[serde(default)]
    processed: Option<ItemList>,
    #[serde(default)]
    failed: Option<ItemList>,
}

#[derive(Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<Document>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    #[serde(skip_serializing_if = "Query::is_empty")]
    query: &'a Query,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    paging: Paging,
    #[serde(default)]
    items: Vec<Document>,
}

#[derive(Deserialize, Default)]
struct Paging {
    #[serde(default)]
    last: Option<String>,
}

impl DetaSession {
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Rejected("endpoint cannot be a base URL".into()))?
            .extend(segments);
        Ok(url)
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl StoreSession for DetaSession {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let resp = self.client.get(self.url(&["items", key])?).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = error_for_status(resp).await?;
        let doc: Value = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(doc))
    }

    async fn put(&self, document: Document) -> Result<Document, StoreError> {
        let resp = self
            .client
            .put(self.url(&["items"])?)
            .json(&PutBody { items: [&document] })
            .send()
            .await?;
        let resp = error_for_status(resp).await?;
        let body: PutResponse = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;

        if let Some(failed) = body.failed.filter(|f| !f.items.is_empty()) {
            return Err(StoreError::Rejected(format!("store refused {} item(s)", failed.items.len())));
        }
        body.processed
            .and_then(|p| p.items.into_iter().next())
            .ok_or_else(|| StoreError::Decode("put response carried no processed item".into()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let resp = self.client.delete(self.url(&["items", key])?).send().await?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn fetch(&self, query: &Query, limit: usize, last: Option<&str>) -> Result<FetchPage, StoreError> {
        let resp = self
            .client
            .post(self.url(&["query"])?)
            .json(&QueryBody { query, limit, last })
            .send()
            .await?;
        let resp = error_for_status(resp).await?;
        let body: QueryResponse = resp.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        debug!(items = body.items.len(), more = body.paging.last.is_some(), "deta query page");
        Ok(FetchPage { items: body.items, last: body.paging.last })
    }

    async fn close(&self) -> Result<(), StoreError> {
        // reqwest has no explicit close; dropping the client releases its pool.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_is_key_prefix() {
        let store = DetaStore::new("a0b1c2_s3cr3t", "https://database.deta.sh/v1/", None).unwrap();
        let url = store.base_url("features").unwrap();
        assert_eq!(url.as_str(), "https://database.deta.sh/v1/a0b1c2/features");
    }

    #[test]
    fn malformed_key_is_rejected() {
        assert!(DetaStore::new("nounderscore", "https://x", None).is_err());
        assert!(DetaStore::new("_secret", "https://x", None).is_err());
    }

    #[test]
    fn debug_hides_project_key() {
        let store = DetaStore::new("abc_topsecret", "https://x", None).unwrap();
        assert!(!format!("{store:?}").contains("topsecret"));
    }

    #[test]
    fn item_urls_escape_keys() {
        let store = DetaStore::new("abc_k", "https://db.example/v1", None).unwrap();
        let session = DetaSession { client: Client::new(), base_url: store.base_url("f").unwrap() };
        let url = session.url(&["items", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://db.example/v1/abc/f/items/a%20b%2Fc");
    }
}
