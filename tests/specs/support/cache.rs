// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory object cache implementing the HTTP surface the SDK expects.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;

use flame_cache::{Object, ObjectMetadata};

#[derive(Clone)]
struct Store {
    base: String,
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    objects: HashMap<String, Object>,
}

async fn create(
    State(store): State<Store>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Json<ObjectMetadata> {
    let mut inner = store.inner.lock();
    inner.next_id += 1;
    let key = format!("{}/{}", session_id, inner.next_id);
    let size = body.len() as u64;
    inner.objects.insert(key.clone(), Object { version: 1, data: body.to_vec() });
    Json(ObjectMetadata { endpoint: format!("{}/objects/{}", store.base, key), version: 1, size })
}

async fn fetch(
    State(store): State<Store>,
    Path(key): Path<(String, String)>,
) -> Result<Json<Object>, StatusCode> {
    let key = format!("{}/{}", key.0, key.1);
    let inner = store.inner.lock();
    inner.objects.get(&key).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update(
    State(store): State<Store>,
    Path(key): Path<(String, String)>,
    Json(body): Json<Object>,
) -> Result<Json<ObjectMetadata>, StatusCode> {
    let key = format!("{}/{}", key.0, key.1);
    let mut inner = store.inner.lock();
    let Some(existing) = inner.objects.get_mut(&key) else {
        return Err(StatusCode::NOT_FOUND);
    };
    if body.version != existing.version {
        return Err(StatusCode::CONFLICT);
    }
    existing.version += 1;
    existing.data = body.data;
    let meta = ObjectMetadata {
        endpoint: format!("{}/objects/{}", store.base, key),
        version: existing.version,
        size: existing.data.len() as u64,
    };
    Ok(Json(meta))
}

/// Spawn the cache; returns its base URL.
pub async fn spawn() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let store = Store { base: base.clone(), inner: Arc::new(Mutex::new(StoreInner::default())) };
    let app = Router::new()
        .route("/objects/{session_id}", post(create))
        .route("/objects/{session_id}/{id}", get(fetch).put(update))
        .with_state(store);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}
