// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task model and lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{SessionId, TaskId};

/// Lifecycle state of a task. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeed,
    Failed,
}

crate::simple_display! {
    TaskState {
        Pending => "pending",
        Running => "running",
        Succeed => "succeed",
        Failed => "failed",
    }
}

impl TaskState {
    /// Event code for this state. Terminal events reuse these codes.
    pub fn code(self) -> i32 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Succeed => 2,
            TaskState::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeed | TaskState::Failed)
    }
}

/// One entry in a task's append-only event log.
///
/// Terminal events carry the code of the matching [`TaskState`]; other
/// codes denote progress annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub code: i32,
    pub message: String,
    pub creation_time: DateTime<Utc>,
}

/// A unit of work within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub session_id: SessionId,
    pub state: TaskState,
    pub creation_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    /// Opaque bytes or an encoded [`crate::ObjectRef`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<u8>>,
    /// Present on every `Succeed` task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<u8>>,
    /// Ordered lifecycle events, append-only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Succeed
    }

    pub fn is_failed(&self) -> bool {
        self.state == TaskState::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Message of the failure event, if this task failed.
    pub fn failed_message(&self) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.code == TaskState::Failed.code())
            .map(|e| e.message.as_str())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
