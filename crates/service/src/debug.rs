// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP debug listener for local development.
//!
//! When a service process starts without `$FLAME_INSTANCE_ENDPOINT`, the
//! harness maps `POST /{entrypoint}` onto the `on_task_invoke` path with a
//! synthetic session. No scheduling, no cache, no session semantics.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use flame_core::FlameError;

use crate::context::TaskContext;
use crate::harness::FlameService;

/// Documented default port of the debug listener.
pub const DEFAULT_DEBUG_PORT: u16 = 5050;

#[derive(Clone)]
struct DebugState {
    service: Arc<tokio::sync::Mutex<Box<dyn FlameService>>>,
    entrypoints: Arc<Vec<String>>,
}

pub(crate) async fn run_debug<S: FlameService + 'static>(
    service: S,
    port: u16,
) -> Result<(), FlameError> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await.map_err(|e| {
        FlameError::invalid_config(format!("cannot bind debug listener on port {port}: {e}"))
    })?;
    info!(port, "debug instance started");
    serve(listener, service).await
}

pub(crate) async fn serve<S: FlameService + 'static>(
    listener: TcpListener,
    service: S,
) -> Result<(), FlameError> {
    let entrypoints = Arc::new(service.entrypoints());
    let state = DebugState {
        service: Arc::new(tokio::sync::Mutex::new(Box::new(service))),
        entrypoints,
    };

    let app = Router::new().route("/{entrypoint}", post(entrypoint_api)).with_state(state);

    axum::serve(listener, app)
        .await
        .map_err(|e| FlameError::internal(format!("debug listener failed: {e}")))
}

async fn entrypoint_api(
    State(state): State<DebugState>,
    Path(entrypoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if !state.entrypoints.iter().any(|name| *name == entrypoint) {
        return (StatusCode::NOT_FOUND, format!("no entrypoint {entrypoint}")).into_response();
    }

    let context = TaskContext {
        task_id: params.get("task_id").cloned().unwrap_or_else(|| "0".to_string()).into(),
        session_id: params.get("session_id").cloned().unwrap_or_else(|| "0".to_string()).into(),
        input: Some(body.to_vec()),
    };

    let mut service = state.service.lock().await;
    match service.on_task_invoke(context).await {
        Ok(Some(output)) => (StatusCode::OK, output).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
