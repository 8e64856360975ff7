// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the object cache service.
//!
//! Three operations, all fatal on non-2xx:
//! - `POST {endpoint}/objects/{session_id}` with raw bytes → metadata
//! - `GET {url}` → `{version, data}`
//! - `PUT {url}` with `{version, data}` → metadata with bumped version

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use flame_core::{FlameContext, FlameError, ObjectRef};

/// Errors from cache operations, wrapped into `FlameError` at the SDK surface.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache is not configured")]
    NotConfigured,

    #[error("cache request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("cache payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("object reference has no url and no inline data")]
    EmptyRef,
}

impl From<CacheError> for FlameError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::NotConfigured => FlameError::invalid_config(e.to_string()),
            _ => FlameError::internal(e.to_string()),
        }
    }
}

/// A cached object as returned by `GET`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub version: u64,
    pub data: Vec<u8>,
}

/// Metadata returned by `POST`/`PUT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Absolute URL of the object.
    pub endpoint: String,
    pub version: u64,
    pub size: u64,
}

/// Client handle for one cache endpoint.
///
/// With no endpoint configured the client degrades to inline references:
/// `put` returns the payload wrapped in an [`ObjectRef`], `get` unwraps it.
#[derive(Debug, Clone)]
pub struct CacheClient {
    endpoint: Option<String>,
    http: reqwest::Client,
}

impl CacheClient {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint.map(|e| e.trim_end_matches('/').to_string());
        Self { endpoint, http: reqwest::Client::new() }
    }

    pub fn from_context(ctx: &FlameContext) -> Self {
        Self::new(ctx.cache_endpoint.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Create a new object bound to `session_id`.
    pub async fn put(&self, session_id: &str, data: Vec<u8>) -> Result<ObjectRef, FlameError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(ObjectRef::inline(data));
        };

        let url = format!("{endpoint}/objects/{session_id}");
        let meta = self.parse_metadata(self.http.post(&url).body(data), &url).await?;
        debug!(url = %meta.endpoint, version = meta.version, "object stored");
        Ok(ObjectRef::remote(meta.endpoint, meta.version))
    }

    /// Read the current value, refreshing `r.version` in place.
    pub async fn get(&self, r: &mut ObjectRef) -> Result<Vec<u8>, FlameError> {
        let Some(url) = &r.url else {
            return r.data.clone().ok_or_else(|| CacheError::EmptyRef.into());
        };

        let resp = self.http.get(url).send().await.map_err(CacheError::from)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CacheError::Status { status: status.as_u16(), url: url.clone() }.into());
        }
        let obj: Object = resp.json().await.map_err(CacheError::from)?;
        r.version = obj.version;
        Ok(obj.data)
    }

    /// Replace the object's value; returns a reference with the new version.
    ///
    /// The supplied version is the caller's last-seen one; the server may
    /// enforce it (optimistic concurrency) or overwrite. Either way callers
    /// must adopt the version on the returned reference.
    pub async fn update(&self, r: &ObjectRef, data: Vec<u8>) -> Result<ObjectRef, FlameError> {
        let Some(url) = &r.url else {
            return Ok(ObjectRef::inline(data));
        };

        let body = Object { version: r.version, data };
        let meta = self.parse_metadata(self.http.put(url).json(&body), url).await?;
        debug!(url = %meta.endpoint, version = meta.version, "object updated");
        Ok(ObjectRef::remote(meta.endpoint, meta.version))
    }

    /// Serialize `value` with the stable object format and store it.
    pub async fn put_json<T: Serialize>(
        &self,
        session_id: &str,
        value: &T,
    ) -> Result<ObjectRef, FlameError> {
        self.put(session_id, serde_json::to_vec(value).map_err(CacheError::from)?).await
    }

    /// Fetch and deserialize, refreshing `r.version` in place.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        r: &mut ObjectRef,
    ) -> Result<T, FlameError> {
        let data = self.get(r).await?;
        Ok(serde_json::from_slice(&data).map_err(CacheError::from)?)
    }

    /// Serialize and update; returns the reference carrying the new version.
    pub async fn update_json<T: Serialize>(
        &self,
        r: &ObjectRef,
        value: &T,
    ) -> Result<ObjectRef, FlameError> {
        self.update(r, serde_json::to_vec(value).map_err(CacheError::from)?).await
    }

    async fn parse_metadata(
        &self,
        req: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<ObjectMetadata, CacheError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CacheError::Status { status: status.as_u16(), url: url.to_string() });
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
