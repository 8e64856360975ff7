// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session model: a live context bound to an application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlameError;
use crate::id::SessionId;
use crate::object::ObjectRef;

/// Lifecycle state of a session.
///
/// Once `Closed`, no new tasks are accepted and the counters freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Closed,
}

crate::simple_display! {
    SessionState {
        Open => "open",
        Closed => "closed",
    }
}

/// Client-side inputs for creating (or opening) a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAttributes {
    /// Client-chosen ID; generated from the application name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub application: String,
    /// Parallelism hint, at least 1.
    pub slots: u32,
    /// Already-serialized shared context for the session's instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_data: Option<Vec<u8>>,
}

impl SessionAttributes {
    pub fn new(application: impl Into<String>) -> Self {
        Self { id: None, application: application.into(), slots: 1, common_data: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_slots(mut self, slots: u32) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_common_data(mut self, data: Vec<u8>) -> Self {
        self.common_data = Some(data);
        self
    }

    /// Validate user-supplied fields before they reach the wire.
    pub fn validate(&self) -> Result<(), FlameError> {
        if let Some(id) = &self.id {
            crate::id::validate_user_id(id)?;
        }
        if self.application.is_empty() {
            return Err(FlameError::invalid_argument("application cannot be empty"));
        }
        if self.slots == 0 {
            return Err(FlameError::invalid_argument("slots must be at least 1"));
        }
        Ok(())
    }
}

/// A session as reported by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub application: String,
    pub slots: u32,
    pub state: SessionState,
    pub creation_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    pub pending: u32,
    pub running: u32,
    pub succeed: u32,
    pub failed: u32,
    /// Reference to the cached shared context; immutable at the frontend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_data: Option<ObjectRef>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
