// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! References to objects in the content cache.
//!
//! An [`ObjectRef`] is either remote (a `url` plus `version` pointing into
//! the cache) or inline (the payload carried directly, for deployments
//! without a cache). Receivers distinguish the two by the presence of a URL.

use serde::{Deserialize, Serialize};

use crate::error::FlameError;

/// Versioned pointer to a cached object, or an inline payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Cache location of the object. `None` means the payload is inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Update counter maintained by the cache. Inline refs stay at 0.
    #[serde(default)]
    pub version: u64,
    /// Inline payload, present only when no cache is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl ObjectRef {
    /// Reference to an object stored in the cache.
    pub fn remote(url: impl Into<String>, version: u64) -> Self {
        Self { url: Some(url.into()), version, data: None }
    }

    /// Reference carrying its payload inline.
    pub fn inline(data: Vec<u8>) -> Self {
        Self { url: None, version: 0, data: Some(data) }
    }

    pub fn is_inline(&self) -> bool {
        self.url.is_none()
    }

    /// Stable wire encoding. `decode(encode(r)) == r` byte-for-byte.
    pub fn encode(&self) -> Result<Vec<u8>, FlameError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FlameError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
