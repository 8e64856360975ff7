// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side contexts handed to service callbacks.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use flame_cache::CacheClient;
use flame_core::{Application, FlameError, ObjectRef, SessionId, TaskId};

/// Context of the session an instance is bound to.
///
/// Owned by the harness for the lifetime of the session and shared
/// read-only with user code. The shared context behind `common_data` is
/// mutable under version control at the object cache.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub application: Application,
    cache: CacheClient,
    common_data: Arc<Mutex<Option<ObjectRef>>>,
}

impl SessionContext {
    /// Build a context directly. The harness does this on `SessionEnter`;
    /// it is public so services can be driven without a socket in tests.
    pub fn new(
        session_id: SessionId,
        application: Application,
        common_data: Option<ObjectRef>,
        cache: CacheClient,
    ) -> Self {
        Self { session_id, application, cache, common_data: Arc::new(Mutex::new(common_data)) }
    }

    /// Read the session's shared context, refreshing the held version.
    pub async fn common_data(&self) -> Result<Option<Vec<u8>>, FlameError> {
        let Some(mut r) = self.common_data.lock().clone() else {
            return Ok(None);
        };
        let data = self.cache.get(&mut r).await?;
        *self.common_data.lock() = Some(r);
        Ok(Some(data))
    }

    /// Read and decode the shared context with the stable object format.
    pub async fn common_data_json<T: DeserializeOwned>(&self) -> Result<Option<T>, FlameError> {
        match self.common_data().await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Re-put the shared context under a new version.
    ///
    /// Not linearizable across instances: concurrent updates from two
    /// instances of the same session are last-writer-wins, and the losing
    /// side sees the winner's value on its next read. A no-op when the
    /// session carries no shared context.
    pub async fn update_common_data(&self, data: Vec<u8>) -> Result<(), FlameError> {
        let Some(current) = self.common_data.lock().clone() else {
            return Ok(());
        };
        let updated = self.cache.update(&current, data).await?;
        *self.common_data.lock() = Some(updated);
        Ok(())
    }

    /// Serialize and [`update_common_data`](Self::update_common_data).
    pub async fn update_common_data_json<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<(), FlameError> {
        self.update_common_data(serde_json::to_vec(value)?).await
    }
}

/// Context of one task invocation; lives only for the duration of the call.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub session_id: SessionId,
    pub input: Option<Vec<u8>>,
}

impl TaskContext {
    /// Decode the input with the stable object format.
    pub fn input_json<T: DeserializeOwned>(&self) -> Result<T, FlameError> {
        let input = self
            .input
            .as_deref()
            .ok_or_else(|| FlameError::invalid_argument("task has no input"))?;
        serde_json::from_slice(input)
            .map_err(|e| FlameError::invalid_argument(format!("cannot decode task input: {e}")))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
