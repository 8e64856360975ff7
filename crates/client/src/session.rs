// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session API: task creation, blocking invocation, and pooled submission.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use flame_core::{FlameError, SessionId, Task, TaskId};
use flame_wire::{FrontendRequest, FrontendResponse, TaskSpec};

use crate::connection::{unexpected, Connection};
use crate::watcher::TaskWatcher;

/// User-supplied observer receiving per-task lifecycle snapshots.
///
/// Callbacks are serialized per session: observers never see interleaved
/// snapshots from two concurrent invocations of the same session.
pub trait TaskInformer: Send {
    fn on_update(&mut self, task: &Task);
}

/// Shared handle to a per-call informer.
pub type Informer = Arc<Mutex<dyn TaskInformer>>;

#[derive(Debug)]
struct SessionInner {
    conn: Connection,
    record: flame_core::Session,
    /// Live reference to the shared context; version refreshed on each read.
    common_data: Mutex<Option<flame_core::ObjectRef>>,
    /// Serializes informer callbacks across invocations of this session.
    informer_gate: Mutex<()>,
}

/// A live session. Cheap to clone; clones share state and may drive
/// `invoke`, `run`, and `create_task` concurrently.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn hydrate(conn: Connection, record: flame_core::Session) -> Self {
        let common_data = Mutex::new(record.common_data.clone());
        Self {
            inner: Arc::new(SessionInner {
                conn,
                record,
                common_data,
                informer_gate: Mutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.record.id
    }

    pub fn application(&self) -> &str {
        &self.inner.record.application
    }

    /// Session state as reported when this handle was hydrated.
    pub fn record(&self) -> &flame_core::Session {
        &self.inner.record
    }

    /// Read the session's shared context through the object cache.
    pub async fn common_data(&self) -> Result<Option<Vec<u8>>, FlameError> {
        let Some(mut r) = self.inner.common_data.lock().clone() else {
            return Ok(None);
        };
        let data = self.inner.conn.cache().get(&mut r).await?;
        *self.inner.common_data.lock() = Some(r);
        Ok(Some(data))
    }

    /// Read and decode the shared context with the stable object format.
    pub async fn common_data_json<T: DeserializeOwned>(&self) -> Result<Option<T>, FlameError> {
        match self.common_data().await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Create a new task in the session; returns it in `pending` state.
    pub async fn create_task(&self, input: Option<Vec<u8>>) -> Result<Task, FlameError> {
        let spec = TaskSpec { session_id: self.id().to_string(), input };
        match self.inner.conn.call(&FrontendRequest::CreateTask { task: spec }).await? {
            FrontendResponse::Task { task } => Ok(task.into()),
            other => Err(unexpected(other)),
        }
    }

    /// Point-in-time read of a task.
    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task, FlameError> {
        let request = FrontendRequest::GetTask {
            session_id: self.id().to_string(),
            task_id: task_id.to_string(),
        };
        match self.inner.conn.call(&request).await? {
            FrontendResponse::Task { task } => Ok(task.into()),
            other => Err(unexpected(other)),
        }
    }

    /// Stream ordered snapshots of a task until it reaches a terminal state.
    pub async fn watch_task(&self, task_id: &TaskId) -> Result<TaskWatcher, FlameError> {
        self.inner.conn.open_watch(self.id().as_str(), task_id.as_str()).await
    }

    /// Invoke a task and block until it completes or fails.
    ///
    /// Each snapshot is delivered to `informer` (serialized per session)
    /// before terminal handling. A `failed` task surfaces as
    /// `FlameError(internal, ..)` carrying the failure event's message; a
    /// `succeed` task returns its output, or `None` when an informer
    /// already consumed the result.
    pub async fn invoke(
        &self,
        input: Option<Vec<u8>>,
        informer: Option<Informer>,
    ) -> Result<Option<Vec<u8>>, FlameError> {
        let task = self.create_task(input).await?;
        debug!(task_id = %task.id, session_id = %self.id(), "task created");
        let mut watcher = self.watch_task(&task.id).await?;

        while let Some(snapshot) = watcher.next().await? {
            let consumed = match &informer {
                Some(informer) => {
                    let _gate = self.inner.informer_gate.lock();
                    informer.lock().on_update(&snapshot);
                    true
                }
                None => false,
            };

            if snapshot.is_failed() {
                let message =
                    snapshot.failed_message().unwrap_or("task failed").to_string();
                return Err(FlameError::internal(message));
            }
            if snapshot.is_completed() {
                return Ok(if consumed { None } else { snapshot.output });
            }
        }

        Err(FlameError::internal("watch stream ended without terminal snapshot"))
    }

    /// Submit the invocation protocol to the connection's worker pool and
    /// return a handle over the result.
    ///
    /// Must be called from within a tokio runtime. Submissions queue once
    /// the pool is saturated.
    pub fn run(&self, input: Option<Vec<u8>>, informer: Option<Informer>) -> TaskHandle {
        let session = self.clone();
        let pool = Arc::clone(&session.inner.conn.inner.pool);
        let handle = tokio::spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .map_err(|_| FlameError::internal("connection closed"))?;
            session.invoke(input, informer).await
        });
        TaskHandle { handle }
    }

    /// Typed [`Session::invoke`]: JSON in, JSON out, output required.
    pub async fn invoke_json<I, O>(&self, input: &I) -> Result<O, FlameError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(input)?;
        let output = self
            .invoke(Some(bytes), None)
            .await?
            .ok_or_else(|| FlameError::internal("task completed without output"))?;
        Ok(serde_json::from_slice(&output)?)
    }

    /// Typed [`Session::run`].
    pub fn run_json<I: Serialize>(&self, input: &I) -> Result<TaskHandle, FlameError> {
        Ok(self.run(Some(serde_json::to_vec(input)?), None))
    }

    /// Close the session at the frontend. Idempotent.
    pub async fn close(&self) -> Result<(), FlameError> {
        self.inner.conn.close_session(self.id().as_str()).await.map(|_| ())
    }
}

/// Future over an asynchronously submitted invocation.
pub struct TaskHandle {
    handle: JoinHandle<Result<Option<Vec<u8>>, FlameError>>,
}

impl TaskHandle {
    /// Await the task output (or the error the blocking protocol raised).
    pub async fn result(self) -> Result<Option<Vec<u8>>, FlameError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(FlameError::internal("invocation cancelled")),
            Err(e) => Err(FlameError::internal(format!("invocation panicked: {e}"))),
        }
    }

    /// Await and decode a required output.
    pub async fn result_json<O: DeserializeOwned>(self) -> Result<O, FlameError> {
        let output = self
            .result()
            .await?
            .ok_or_else(|| FlameError::internal("task completed without output"))?;
        Ok(serde_json::from_slice(&output)?)
    }

    /// Stop watching. The remote task keeps running; the frontend owns its
    /// fate. Dropping the watcher closes its stream, so nothing leaks.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
