// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-level configuration.
//!
//! A single TOML document supplies the frontend endpoint, the cache
//! endpoint, and packaging options. Resolution order: `$FLAME_CONF` >
//! `~/.flame/flame.toml` > built-in defaults. Individual keys are
//! overridden by `FLAME_ENDPOINT` and `FLAME_CACHE_ENDPOINT`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FlameError;

/// Default frontend address when no configuration is present.
pub const DEFAULT_FLAME_ENDPOINT: &str = "127.0.0.1:8080";

/// Conventional cache address. The cache is opt-in: with no `cache_endpoint`
/// configured the SDK falls back to inline object references.
pub const DEFAULT_FLAME_CACHE_ENDPOINT: &str = "http://127.0.0.1:8090";

/// Config file path relative to the home directory.
pub const FLAME_CONF_RELATIVE: &str = ".flame/flame.toml";

/// Packaging options for the Runner deployer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Storage base for uploaded archives: `file://dir` or `http(s)://host/prefix/`.
    pub storage: String,
    /// Glob patterns excluded from packaged working directories.
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// Resolved SDK configuration, injected explicitly into connections and
/// cache clients rather than read from process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlameContext {
    /// Frontend address, `host:port`.
    pub endpoint: String,
    /// Object cache base URL; `None` disables the cache (inline refs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageConfig>,
}

impl Default for FlameContext {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FLAME_ENDPOINT.to_string(),
            cache_endpoint: None,
            package: None,
        }
    }
}

impl FlameContext {
    /// Load configuration from the conventional location plus environment.
    pub fn load() -> Result<Self, FlameError> {
        let path = match std::env::var("FLAME_CONF") {
            Ok(p) => Some(PathBuf::from(p)),
            Err(_) => dirs::home_dir().map(|h| h.join(FLAME_CONF_RELATIVE)),
        };

        let mut ctx = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        ctx.apply_env();
        Ok(ctx)
    }

    /// Parse a specific config file.
    pub fn from_file(path: &Path) -> Result<Self, FlameError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FlameError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            FlameError::invalid_config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("FLAME_ENDPOINT") {
            if !endpoint.is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(cache) = std::env::var("FLAME_CACHE_ENDPOINT") {
            if !cache.is_empty() {
                self.cache_endpoint = Some(cache);
            }
        }
    }

    /// Exclude patterns for packaging, empty when unconfigured.
    pub fn excludes(&self) -> &[String] {
        self.package.as_ref().map(|p| p.excludes.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
