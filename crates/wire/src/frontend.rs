// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages on the frontend channel.
//!
//! Every RPC is one request frame answered by one response frame, except
//! `WatchTask`: the frontend keeps the connection open and streams
//! [`TaskDesc`] frames until a terminal snapshot has been written.
//!
//! Timestamps cross the wire as integer milliseconds since epoch;
//! `common_data`, `input`, and `output` are opaque byte strings (raw
//! payloads or encoded [`ObjectRef`]s).

use serde::{Deserialize, Serialize};

use flame_core::{
    datetime_from_epoch_ms, Application, ApplicationAttributes, ApplicationState, Event,
    FlameError, FlameErrorCode, ObjectRef, Session, SessionState, Task, TaskState,
};

/// Client-supplied description of a session to create or open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub application: String,
    pub slots: u32,
    /// Encoded [`ObjectRef`] of the session's shared context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_data: Option<Vec<u8>>,
}

/// Client-supplied description of a task to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<u8>>,
}

/// Request from client to frontend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FrontendRequest {
    /// Register an application (idempotent)
    RegisterApplication { name: String, application: ApplicationAttributes },

    /// Remove a registered application
    UnregisterApplication { name: String },

    /// Read a single application
    GetApplication { name: String },

    /// List all applications
    ListApplication,

    /// Create a session with a client-chosen or generated ID
    CreateSession { session_id: String, session: SessionSpec },

    /// Open an existing session; create it when absent and a spec is given
    OpenSession {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionSpec>,
    },

    /// Read a single session
    GetSession { session_id: String },

    /// List all sessions
    ListSession,

    /// Close a session (idempotent)
    CloseSession { session_id: String },

    /// Create a task in `pending` state
    CreateTask { task: TaskSpec },

    /// Point-in-time task read
    GetTask { session_id: String, task_id: String },

    /// Stream ordered task snapshots until a terminal state
    WatchTask { session_id: String, task_id: String },
}

/// Response from frontend to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FrontendResponse {
    /// Generic success
    Ok,

    /// Single application
    Application { application: ApplicationDesc },

    /// List of applications
    Applications { applications: Vec<ApplicationDesc> },

    /// Single session
    Session { session: SessionDesc },

    /// List of sessions
    Sessions { sessions: Vec<SessionDesc> },

    /// Single task; also the frame type streamed by `WatchTask`
    Task { task: TaskDesc },

    /// Error response
    Error { code: FlameErrorCode, message: String },
}

impl FrontendResponse {
    pub fn error(code: FlameErrorCode, message: impl Into<String>) -> Self {
        Self::Error { code, message: message.into() }
    }
}

impl From<FlameError> for FrontendResponse {
    fn from(e: FlameError) -> Self {
        Self::Error { code: e.code, message: e.message }
    }
}

/// An application on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDesc {
    pub name: String,
    pub state: ApplicationState,
    pub creation_time: i64,
    pub spec: ApplicationAttributes,
}

impl From<&Application> for ApplicationDesc {
    fn from(app: &Application) -> Self {
        Self {
            name: app.name.clone(),
            state: app.state,
            creation_time: app.creation_time.timestamp_millis(),
            spec: app.spec.clone(),
        }
    }
}

impl From<ApplicationDesc> for Application {
    fn from(desc: ApplicationDesc) -> Self {
        Self {
            name: desc.name,
            state: desc.state,
            creation_time: datetime_from_epoch_ms(desc.creation_time),
            spec: desc.spec,
        }
    }
}

/// A session on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDesc {
    pub id: String,
    pub application: String,
    pub slots: u32,
    pub state: SessionState,
    pub creation_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<i64>,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub running: u32,
    #[serde(default)]
    pub succeed: u32,
    #[serde(default)]
    pub failed: u32,
    /// Encoded [`ObjectRef`] of the session's shared context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_data: Option<Vec<u8>>,
}

impl From<&Session> for SessionDesc {
    fn from(ssn: &Session) -> Self {
        Self {
            id: ssn.id.to_string(),
            application: ssn.application.clone(),
            slots: ssn.slots,
            state: ssn.state,
            creation_time: ssn.creation_time.timestamp_millis(),
            completion_time: ssn.completion_time.map(|t| t.timestamp_millis()),
            pending: ssn.pending,
            running: ssn.running,
            succeed: ssn.succeed,
            failed: ssn.failed,
            common_data: ssn.common_data.as_ref().and_then(|r| r.encode().ok()),
        }
    }
}

impl TryFrom<SessionDesc> for Session {
    type Error = FlameError;

    fn try_from(desc: SessionDesc) -> Result<Self, FlameError> {
        let common_data = match desc.common_data {
            Some(bytes) => Some(ObjectRef::decode(&bytes)?),
            None => None,
        };
        Ok(Self {
            id: desc.id.into(),
            application: desc.application,
            slots: desc.slots,
            state: desc.state,
            creation_time: datetime_from_epoch_ms(desc.creation_time),
            completion_time: desc.completion_time.map(datetime_from_epoch_ms),
            pending: desc.pending,
            running: desc.running,
            succeed: desc.succeed,
            failed: desc.failed,
            common_data,
        })
    }
}

/// One lifecycle event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDesc {
    pub code: i32,
    pub message: String,
    pub creation_time: i64,
}

impl From<&Event> for EventDesc {
    fn from(e: &Event) -> Self {
        Self {
            code: e.code,
            message: e.message.clone(),
            creation_time: e.creation_time.timestamp_millis(),
        }
    }
}

impl From<EventDesc> for Event {
    fn from(desc: EventDesc) -> Self {
        Self {
            code: desc.code,
            message: desc.message,
            creation_time: datetime_from_epoch_ms(desc.creation_time),
        }
    }
}

/// A task snapshot on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDesc {
    pub id: String,
    pub session_id: String,
    pub state: TaskState,
    pub creation_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDesc>,
}

impl From<&Task> for TaskDesc {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            session_id: task.session_id.to_string(),
            state: task.state,
            creation_time: task.creation_time.timestamp_millis(),
            completion_time: task.completion_time.map(|t| t.timestamp_millis()),
            input: task.input.clone(),
            output: task.output.clone(),
            events: task.events.iter().map(EventDesc::from).collect(),
        }
    }
}

impl From<TaskDesc> for Task {
    fn from(desc: TaskDesc) -> Self {
        Self {
            id: desc.id.into(),
            session_id: desc.session_id.into(),
            state: desc.state,
            creation_time: datetime_from_epoch_ms(desc.creation_time),
            completion_time: desc.completion_time.map(datetime_from_epoch_ms),
            input: desc.input,
            output: desc.output,
            events: desc.events.into_iter().map(Event::from).collect(),
        }
    }
}

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod tests;
