// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages on the instance endpoint.
//!
//! The executor owning a worker process drives it over a local stream
//! socket with three calls, delivered strictly in order: one
//! `SessionEnter`, any number of `TaskInvoke`s, then `SessionLeave`.

use serde::{Deserialize, Serialize};

use super::frontend::ApplicationDesc;

/// Request from the executor to a worker instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum InstanceRequest {
    /// Bind the instance to a session
    SessionEnter {
        session_id: String,
        application: ApplicationDesc,
        /// Encoded `ObjectRef` of the session's shared context
        #[serde(default, skip_serializing_if = "Option::is_none")]
        common_data: Option<Vec<u8>>,
    },

    /// Execute one task
    TaskInvoke {
        task_id: String,
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Vec<u8>>,
    },

    /// Release the instance from its session
    SessionLeave,
}

/// Response from a worker instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum InstanceResponse {
    /// Outcome of `SessionEnter` / `SessionLeave`
    Result {
        return_code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Outcome of `TaskInvoke`
    TaskResult {
        return_code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Vec<u8>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl InstanceResponse {
    pub fn ok() -> Self {
        Self::Result { return_code: 0, message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Result { return_code: -1, message: Some(message.into()) }
    }

    pub fn task_ok(output: Option<Vec<u8>>) -> Self {
        Self::TaskResult { return_code: 0, output, message: None }
    }

    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskResult { return_code: -1, output: None, message: Some(message.into()) }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
