// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types for applications, sessions, and tasks.
//!
//! IDs are opaque strings. Auto-generated IDs use a short human-readable
//! form derived from a base name plus a random suffix; user-supplied IDs
//! must be non-empty and at most [`USER_ID_MAX_LEN`] characters.

use crate::error::FlameError;

/// Maximum length for a user-supplied ID.
pub const USER_ID_MAX_LEN: usize = 128;

/// Characters of the base name kept when generating an ID.
pub const GENERATED_BASE_LEN: usize = 16;

/// Random suffix length for generated IDs.
pub const GENERATED_SUFFIX_LEN: usize = 10;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Validate a user-supplied ID: non-empty, at most [`USER_ID_MAX_LEN`] chars.
pub fn validate_user_id(id: &str) -> Result<(), FlameError> {
    if id.is_empty() {
        return Err(FlameError::invalid_argument("id cannot be empty"));
    }
    if id.chars().count() > USER_ID_MAX_LEN {
        return Err(FlameError::invalid_argument(format!(
            "id too long ({} chars, max {})",
            id.chars().count(),
            USER_ID_MAX_LEN
        )));
    }
    Ok(())
}

crate::string_id! {
    /// Unique identifier for a registered application.
    pub struct ApplicationId;
}

crate::string_id! {
    /// Unique identifier for a session.
    ///
    /// Sessions are a live context bound to an application; their IDs are
    /// either chosen by the client or generated from the application name.
    pub struct SessionId;
}

crate::string_id! {
    /// Unique identifier for a task within a session.
    pub struct TaskId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
