// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application model: the registered unit of executable code.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution model of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shim {
    /// In-process host execution.
    Host,
    /// Local stream-socket RPC instance (the harness in `flame-service`).
    Grpc,
    /// Subprocess speaking stdio.
    Stdio,
    /// Log-only placeholder.
    Log,
    /// Remote REST endpoint.
    Rest,
}

crate::simple_display! {
    Shim {
        Host => "host",
        Grpc => "grpc",
        Stdio => "stdio",
        Log => "log",
        Rest => "rest",
    }
}

/// Whether an application accepts new sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Enabled,
    Disabled,
}

crate::simple_display! {
    ApplicationState {
        Enabled => "enabled",
        Disabled => "disabled",
    }
}

/// Input/output/common-data typing hints attached at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_data: Option<String>,
}

/// Everything a client supplies when registering an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAttributes {
    pub shim: Shim,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Code location for on-demand install (`file://` archive or directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    /// Seconds an idle instance is kept before release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_release: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ApplicationSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl ApplicationAttributes {
    /// Minimal attributes for a given shim; everything else defaulted.
    pub fn new(shim: Shim) -> Self {
        Self {
            shim,
            image: None,
            command: None,
            arguments: Vec::new(),
            environments: BTreeMap::new(),
            working_directory: None,
            url: None,
            max_instances: None,
            delay_release: None,
            schema: None,
            description: None,
            labels: Vec::new(),
        }
    }
}

/// A registered application as reported by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub state: ApplicationState,
    pub creation_time: DateTime<Utc>,
    pub spec: ApplicationAttributes,
}

#[cfg(test)]
#[path = "application_tests.rs"]
mod tests;
