// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the SDK.
//!
//! [`FlameError`] is the only failure surface exposed to users. Internal
//! error enums in other crates convert into it via `From` impls; transport
//! failures are wrapped as [`FlameErrorCode::Internal`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of an SDK failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlameErrorCode {
    /// Bad addresses, missing config keys, unsupported URL schemes.
    InvalidConfig,
    /// Malformed requests, wrong types, non-callable targets.
    InvalidArgument,
    /// Operating on a closed session, spec mismatch on open.
    InvalidState,
    /// Missing session, application, or task.
    NotFound,
    /// Transport, cache, serialization, or remote user-code failures.
    Internal,
}

crate::simple_display! {
    FlameErrorCode {
        InvalidConfig => "invalid_config",
        InvalidArgument => "invalid_argument",
        InvalidState => "invalid_state",
        NotFound => "not_found",
        Internal => "internal",
    }
}

/// The public failure type of the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct FlameError {
    pub code: FlameErrorCode,
    pub message: String,
}

impl FlameError {
    pub fn new(code: FlameErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(FlameErrorCode::InvalidConfig, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FlameErrorCode::InvalidArgument, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(FlameErrorCode::InvalidState, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FlameErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FlameErrorCode::Internal, message)
    }
}

impl From<serde_json::Error> for FlameError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {e}"))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
