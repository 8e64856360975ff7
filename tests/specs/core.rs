// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core session and task dispatch specs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use flame_core::{FlameError, FlameErrorCode, SessionAttributes, TaskState};
use flame_service::{Entrypoint, FlameService, SessionContext, TaskContext};

use super::support::{cache, cluster::Cluster};

#[derive(Serialize, Deserialize)]
struct TestRequest {
    input: String,
    update_common_data: bool,
}

#[derive(Serialize, Deserialize)]
struct TestResponse {
    common_data: Option<String>,
}

/// Service reporting (and optionally updating) the session context.
struct ContextService {
    ctx: Option<SessionContext>,
}

#[async_trait]
impl FlameService for ContextService {
    async fn on_session_enter(&mut self, context: SessionContext) -> Result<(), FlameError> {
        self.ctx = Some(context);
        Ok(())
    }

    async fn on_task_invoke(
        &mut self,
        context: TaskContext,
    ) -> Result<Option<Vec<u8>>, FlameError> {
        let request: TestRequest = context.input_json()?;
        let ctx =
            self.ctx.as_ref().ok_or_else(|| FlameError::invalid_state("no session"))?;

        let before: Option<String> = ctx.common_data_json().await?;
        if request.update_common_data {
            ctx.update_common_data_json(&request.input).await?;
        }

        Ok(Some(serde_json::to_vec(&TestResponse { common_data: before })?))
    }

    async fn on_session_leave(&mut self) -> Result<(), FlameError> {
        self.ctx = None;
        Ok(())
    }
}

/// Service whose every invoke raises.
struct ErrorService;

#[async_trait]
impl FlameService for ErrorService {
    async fn on_session_enter(&mut self, _context: SessionContext) -> Result<(), FlameError> {
        Ok(())
    }

    async fn on_task_invoke(
        &mut self,
        _context: TaskContext,
    ) -> Result<Option<Vec<u8>>, FlameError> {
        Err(FlameError::internal("boom"))
    }

    async fn on_session_leave(&mut self) -> Result<(), FlameError> {
        Ok(())
    }
}

#[tokio::test]
async fn invoke_returns_what_the_worker_returned() {
    let service = Entrypoint::blocking("shout", |s: String| Ok(s.to_uppercase()));
    let cluster = Cluster::start(service, None).await;
    let conn = cluster.connect().await;

    let session = conn.create_session(SessionAttributes::new("flmtest")).await.unwrap();
    let output: String = session.invoke_json(&"echo me".to_string()).await.unwrap();
    assert_eq!(output, "ECHO ME");
}

#[tokio::test]
async fn common_data_round_trips_through_the_cache() {
    let cache_base = cache::spawn().await;
    let cluster = Cluster::start(ContextService { ctx: None }, Some(cache_base)).await;
    let conn = cluster.connect().await;

    let attrs = SessionAttributes::new("flmtest")
        .with_id("ssn-cd")
        .with_common_data(serde_json::to_vec(&"A").unwrap());
    conn.create_session(attrs).await.unwrap();

    // A later lookup of the session reads back the same shared context.
    let session = conn.get_session("ssn-cd").await.unwrap();
    let data: Option<String> = session.common_data_json().await.unwrap();
    assert_eq!(data.as_deref(), Some("A"));
}

#[tokio::test]
async fn common_data_update_from_worker_is_visible_to_client() {
    let cache_base = cache::spawn().await;
    let cluster = Cluster::start(ContextService { ctx: None }, Some(cache_base)).await;
    let conn = cluster.connect().await;

    let attrs = SessionAttributes::new("flmtest")
        .with_common_data(serde_json::to_vec(&"A").unwrap());
    let session = conn.create_session(attrs).await.unwrap();

    // The task observes the old value while updating to the new one.
    let response: TestResponse = session
        .invoke_json(&TestRequest { input: "B".into(), update_common_data: true })
        .await
        .unwrap();
    assert_eq!(response.common_data.as_deref(), Some("A"));

    // The client's next read sees the worker's update.
    let data: Option<String> = session.common_data_json().await.unwrap();
    assert_eq!(data.as_deref(), Some("B"));
}

#[tokio::test]
async fn failed_task_surfaces_message_and_event() {
    let cluster = Cluster::start(ErrorService, None).await;
    let conn = cluster.connect().await;

    let session = conn.create_session(SessionAttributes::new("flmtest")).await.unwrap();

    let task = session.create_task(Some(b"1".to_vec())).await.unwrap();
    let mut watcher = session.watch_task(&task.id).await.unwrap();
    let mut last = None;
    while let Some(snapshot) = watcher.next().await.unwrap() {
        last = Some(snapshot);
    }
    let last = last.unwrap();
    assert!(last.is_failed());
    assert_eq!(last.failed_message(), Some("boom"));

    // The event log holds exactly one terminal event, agreeing with state.
    let terminal_events: Vec<_> = last
        .events
        .iter()
        .filter(|e| e.code == TaskState::Succeed.code() || e.code == TaskState::Failed.code())
        .collect();
    assert_eq!(terminal_events.len(), 1);

    // And a fresh invoke raises the same message.
    let err = session.invoke(Some(b"2".to_vec()), None).await.unwrap_err();
    assert_eq!(err.code, FlameErrorCode::Internal);
    assert_eq!(err.message, "boom");
}

#[tokio::test]
async fn session_counters_track_terminal_states() {
    let service = Entrypoint::blocking("echo", |s: String| Ok(s));
    let cluster = Cluster::start(service, None).await;
    let conn = cluster.connect().await;

    let session =
        conn.create_session(SessionAttributes::new("flmtest").with_id("ssn-n")).await.unwrap();
    for i in 0..3 {
        let _: String = session.invoke_json(&format!("task {i}")).await.unwrap();
    }

    let refreshed = conn.get_session("ssn-n").await.unwrap();
    assert_eq!(refreshed.record().succeed, 3);
    assert_eq!(refreshed.record().failed, 0);
}

#[tokio::test]
async fn closed_session_rejects_new_tasks() {
    let service = Entrypoint::blocking("echo", |s: String| Ok(s));
    let cluster = Cluster::start(service, None).await;
    let conn = cluster.connect().await;

    let session = conn.create_session(SessionAttributes::new("flmtest")).await.unwrap();
    session.close().await.unwrap();

    let err = session.create_task(Some(b"late".to_vec())).await.unwrap_err();
    assert_eq!(err.code, FlameErrorCode::InvalidState);
}
