use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::errors::StoreError;
use crate::store::query::Query;
use crate::store::{DetaStore, DocumentStore};

const PROJECT_KEY: &str = "abc123_secret";

type Items = Arc<Mutex<BTreeMap<String, Value>>>;

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(PROJECT_KEY) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn get_item(
    State(items): State<Items>,
    headers: HeaderMap,
    Path((_project, _base, key)): Path<(String, String, String)>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let items = items.lock().unwrap();
    items.get(&key).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_item(
    State(items): State<Items>,
    headers: HeaderMap,
    Path((_project, _base, key)): Path<(String, String, String)>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    items.lock().unwrap().remove(&key);
    Ok(Json(json!({ "key": key })))
}

async fn put_items(
    State(items): State<Items>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    authorized(&headers)?;
    let mut processed = Vec::new();
    let mut failed = Vec::new();
    for item in body["items"].as_array().cloned().unwrap_or_default() {
        if item.get("reject").is_some() {
            failed.push(item);
            continue;
        }
        let key = item["key"].as_str().unwrap_or_default().to_string();
        items.lock().unwrap().insert(key, item.clone());
        processed.push(item);
    }
    let mut resp = json!({ "processed": { "items": processed } });
    if !failed.is_empty() {
        resp["failed"] = json!({ "items": failed });
    }
    Ok((StatusCode::MULTI_STATUS, Json(resp)))
}

async fn query_items(
    State(items): State<Items>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let query = Query::from_value(body.get("query").cloned().unwrap_or(Value::Null))
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let limit = body["limit"].as_u64().unwrap_or(1000) as usize;
    let last = body.get("last").and_then(Value::as_str).map(str::to_string);

    let items = items.lock().unwrap();
    let matching: Vec<Value> = items
        .iter()
        .filter(|(k, _)| last.as_ref().map_or(true, |l| k.as_str() > l.as_str()))
        .filter(|(_, v)| query.matches(v))
        .map(|(_, v)| v.clone())
        .collect();
    let page: Vec<Value> = matching.iter().take(limit).cloned().collect();
    let next = if matching.len() > limit { page.last().map(|v| v["key"].clone()) } else { None };

    let mut paging = json!({ "size": page.len() });
    if let Some(next) = next {
        paging["last"] = next;
    }
    Ok(Json(json!({ "paging": paging, "items": page })))
}

async fn start_mock() -> anyhow::Result<(String, Items)> {
    let items: Items = Arc::default();
    let app = Router::new()
        .route("/v1/:project/:base/items", put(put_items))
        .route("/v1/:project/:base/items/:key", get(get_item).delete(delete_item))
        .route("/v1/:project/:base/query", post(query_items))
        .with_state(items.clone());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock deta error: {}", e);
        }
    });
    Ok((format!("http://{}/v1", addr), items))
}

#[tokio::test]
async fn crud_round_trip_over_http() -> anyhow::Result<()> {
    let (endpoint, items) = start_mock().await?;
    let store = DetaStore::new(PROJECT_KEY, &endpoint, None)?;
    let session = store.open("features").await?;

    let stored = session.put(json!({ "key": "a b", "n": 1 })).await?;
    assert_eq!(stored["n"], 1);
    assert_eq!(items.lock().unwrap().len(), 1);

    let got = session.get("a b").await?.expect("item");
    assert_eq!(got["key"], "a b");
    assert!(session.get("missing").await?.is_none());

    session.delete("a b").await?;
    session.delete("a b").await?;
    assert!(session.get("a b").await?.is_none());
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn query_pages_follow_the_cursor() -> anyhow::Result<()> {
    let (endpoint, _items) = start_mock().await?;
    let store = DetaStore::new(PROJECT_KEY, &endpoint, None)?;
    let session = store.open("features").await?;
    for i in 0..5 {
        session.put(json!({ "key": format!("k{i}"), "even": i % 2 == 0 })).await?;
    }

    let first = session.fetch(&Query::all(), 2, None).await?;
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.last.as_deref(), Some("k1"));
    let rest = session.fetch(&Query::all(), 10, first.last.as_deref()).await?;
    assert_eq!(rest.items.len(), 3);
    assert!(rest.last.is_none());

    let evens = session.fetch(&Query::all().eq("even", true), 10, None).await?;
    assert_eq!(evens.items.len(), 3);
    Ok(())
}

#[tokio::test]
async fn rejected_item_is_an_error() -> anyhow::Result<()> {
    let (endpoint, _items) = start_mock().await?;
    let store = DetaStore::new(PROJECT_KEY, &endpoint, None)?;
    let session = store.open("features").await?;
    let err = session.put(json!({ "key": "x", "reject": true })).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    Ok(())
}

#[tokio::test]
async fn wrong_project_key_surfaces_status() -> anyhow::Result<()> {
    let (endpoint, _items) = start_mock().await?;
    let store = DetaStore::new("abc123_wrong", &endpoint, None)?;
    let session = store.open("features").await?;
    let err = session.get("k").await.unwrap_err();
    assert!(matches!(err, StoreError::Status { status: 401, .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() -> anyhow::Result<()> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let store = DetaStore::new(PROJECT_KEY, &format!("http://{}/v1", addr), None)?;
    let session = store.open("features").await?;
    let err = session.get("k").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    Ok(())
}
