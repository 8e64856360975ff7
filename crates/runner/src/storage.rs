// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package storage backends for the Runner deployer.
//!
//! `file://absolute/path` directories and `http(s)://host/prefix/`
//! endpoints (PUT/GET/DELETE). Content type is unimportant; archives are
//! named `{application_name}.tar.gz`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use flame_core::FlameError;

/// Unified upload/download/delete over a storage base URL.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Upload a package file; returns the full URL of the stored copy.
    async fn upload(&self, local_path: &Path, filename: &str) -> Result<String, FlameError>;

    /// Delete a stored package. Idempotent: missing files are not an error.
    async fn delete(&self, filename: &str) -> Result<(), FlameError>;

    /// Download a stored package to `local_path`.
    async fn download(&self, filename: &str, local_path: &Path) -> Result<(), FlameError>;
}

/// Pick a backend from the storage base URL scheme.
pub fn storage_for(storage_base: &str) -> Result<Box<dyn StorageBackend>, FlameError> {
    if storage_base.starts_with("file://") {
        Ok(Box::new(FileStorage::new(storage_base)?))
    } else if storage_base.starts_with("http://") || storage_base.starts_with("https://") {
        Ok(Box::new(HttpStorage::new(storage_base)))
    } else {
        Err(FlameError::invalid_config(format!(
            "unsupported storage scheme in {storage_base:?}; supported: file://, http://, https://"
        )))
    }
}

/// Local-filesystem storage.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(storage_base: &str) -> Result<Self, FlameError> {
        let dir = storage_base
            .strip_prefix("file://")
            .ok_or_else(|| {
                FlameError::invalid_config(format!("invalid file storage URL: {storage_base}"))
            })
            .map(PathBuf::from)?;
        if !dir.is_dir() {
            return Err(FlameError::invalid_config(format!(
                "storage directory does not exist: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn upload(&self, local_path: &Path, filename: &str) -> Result<String, FlameError> {
        let dest = self.dir.join(filename);
        if dest.exists() {
            debug!(dest = %dest.display(), "package already in storage, skipping upload");
        } else {
            std::fs::copy(local_path, &dest).map_err(|e| {
                FlameError::internal(format!(
                    "failed to copy package to {}: {e}",
                    dest.display()
                ))
            })?;
        }
        Ok(format!("file://{}", dest.display()))
    }

    async fn delete(&self, filename: &str) -> Result<(), FlameError> {
        let dest = self.dir.join(filename);
        if dest.exists() {
            if let Err(e) = std::fs::remove_file(&dest) {
                warn!(dest = %dest.display(), "failed to remove package: {e}");
            }
        }
        Ok(())
    }

    async fn download(&self, filename: &str, local_path: &Path) -> Result<(), FlameError> {
        let source = self.dir.join(filename);
        if !source.exists() {
            return Err(FlameError::internal(format!(
                "file not found in storage: {}",
                source.display()
            )));
        }
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlameError::internal(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        std::fs::copy(&source, local_path).map_err(|e| {
            FlameError::internal(format!("failed to download package: {e}"))
        })?;
        Ok(())
    }
}

/// HTTP storage: PUT to upload, GET to download, DELETE to remove.
#[derive(Debug)]
pub struct HttpStorage {
    base: String,
    http: reqwest::Client,
}

impl HttpStorage {
    pub fn new(storage_base: &str) -> Self {
        Self {
            base: format!("{}/", storage_base.trim_end_matches('/')),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, filename: &str) -> String {
        format!("{}{filename}", self.base)
    }
}

#[async_trait]
impl StorageBackend for HttpStorage {
    async fn upload(&self, local_path: &Path, filename: &str) -> Result<String, FlameError> {
        let data = std::fs::read(local_path).map_err(|e| {
            FlameError::internal(format!("cannot read {}: {e}", local_path.display()))
        })?;

        let url = self.url(filename);
        let resp = self
            .http
            .put(&url)
            .body(data)
            .send()
            .await
            .map_err(|e| FlameError::internal(format!("failed to upload package: {e}")))?;

        match resp.status().as_u16() {
            200 | 201 | 204 => {
                debug!(%url, "package uploaded");
                Ok(url)
            }
            status => Err(FlameError::internal(format!(
                "failed to upload package to {url}: HTTP {status}"
            ))),
        }
    }

    async fn delete(&self, filename: &str) -> Result<(), FlameError> {
        let url = self.url(filename);
        match self.http.delete(&url).send().await {
            Ok(resp) if matches!(resp.status().as_u16(), 200 | 204 | 404) => {
                debug!(%url, "package removed from storage");
            }
            Ok(resp) => warn!(%url, status = resp.status().as_u16(), "failed to delete package"),
            Err(e) => warn!(%url, "failed to delete package: {e}"),
        }
        Ok(())
    }

    async fn download(&self, filename: &str, local_path: &Path) -> Result<(), FlameError> {
        let url = self.url(filename);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FlameError::internal(format!("failed to download package: {e}")))?;

        if !resp.status().is_success() {
            return Err(FlameError::internal(format!(
                "failed to download package from {url}: HTTP {}",
                resp.status().as_u16()
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| FlameError::internal(format!("failed to download package: {e}")))?;

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlameError::internal(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(local_path, &data).map_err(|e| {
            FlameError::internal(format!("cannot write {}: {e}", local_path.display()))
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
