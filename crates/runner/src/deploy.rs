// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Runner deployer: a context-scoped application built from the
//! caller's working directory.
//!
//! Deploy packages the directory, uploads the archive, registers a one-off
//! application cloned from the `flmrun` template, and serves execution
//! state through sessions. Teardown runs every cleanup step even when an
//! earlier one fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{error, info};

use flame_cache::CacheClient;
use flame_client::{Connection, Session, TaskHandle};
use flame_core::{FlameContext, FlameError, ObjectRef, SessionAttributes};

use crate::package;
use crate::storage::{storage_for, StorageBackend};
use crate::types::{RunnerContext, RunnerRequest, RunnerValue};

/// Name of the preconfigured template application runner deployments clone.
pub const FLMRUN_TEMPLATE: &str = "flmrun";

/// Per-service options controlling the derived instance policy.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    /// Persist execution state to the cache after each task.
    pub stateful: bool,
    /// Scale instances with pending tasks instead of pinning one.
    pub autoscale: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { stateful: false, autoscale: true }
    }
}

/// An ephemeral application tied to the caller's working directory.
///
/// Lifecycle: packaged → uploaded → registered → active → torn down.
/// Always call [`Runner::teardown`] when done; it is safe to call twice.
pub struct Runner {
    name: String,
    conn: Connection,
    cache: CacheClient,
    storage: Box<dyn StorageBackend>,
    package_path: PathBuf,
    archive_name: String,
    registered: bool,
    sessions: Mutex<Vec<Session>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("name", &self.name)
            .field("archive_name", &self.archive_name)
            .field("registered", &self.registered)
            .finish()
    }
}

impl Runner {
    /// Package the current directory and register `name` at the frontend.
    ///
    /// On a registration failure the uploaded archive and the local
    /// package file are rolled back before the error surfaces.
    pub async fn deploy(ctx: &FlameContext, name: &str) -> Result<Self, FlameError> {
        let package_cfg = ctx.package.as_ref().ok_or_else(|| {
            FlameError::invalid_config(
                "package configuration is not set; configure [package] in flame.toml",
            )
        })?;

        let conn = Connection::from_context(ctx).await?;
        let cache = CacheClient::from_context(ctx);
        let storage = storage_for(&package_cfg.storage)?;

        let cwd = std::env::current_dir()
            .map_err(|e| FlameError::internal(format!("cannot resolve cwd: {e}")))?;
        let package_path = package::package_working_dir(&cwd, name, &package_cfg.excludes)?;
        let archive_name = format!("{name}.tar.gz");
        info!(package = %package_path.display(), "created package");

        let storage_url = match storage.upload(&package_path, &archive_name).await {
            Ok(url) => url,
            Err(e) => {
                remove_local(&package_path);
                return Err(e);
            }
        };
        info!(%storage_url, "uploaded package");

        let template = match conn.get_application(FLMRUN_TEMPLATE).await {
            Ok(app) => app,
            Err(e) => {
                let _ = storage.delete(&archive_name).await;
                remove_local(&package_path);
                return Err(FlameError::internal(format!(
                    "failed to get {FLMRUN_TEMPLATE} application template: {e}"
                )));
            }
        };

        let mut spec = template.spec;
        spec.url = Some(storage_url);
        spec.working_directory = Some(format!("/opt/{name}"));
        spec.description = Some(format!("Runner application: {name}"));

        if let Err(e) = conn.register_application(name, spec).await {
            let _ = storage.delete(&archive_name).await;
            remove_local(&package_path);
            return Err(FlameError::internal(format!("failed to register application: {e}")));
        }
        info!(application = name, "registered runner application");

        Ok(Self {
            name: name.to_string(),
            conn,
            cache,
            storage,
            package_path,
            archive_name,
            registered: true,
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a session serving `state` and return a call proxy for it.
    pub async fn service(
        &self,
        state: serde_json::Value,
        options: RunnerOptions,
    ) -> Result<ServiceHandle, FlameError> {
        let runner_ctx = RunnerContext::new(state, options.stateful, options.autoscale)?;
        let attrs = SessionAttributes::new(self.name.as_str())
            .with_common_data(serde_json::to_vec(&runner_ctx)?);
        let session = self.conn.create_session(attrs).await?;
        info!(session_id = %session.id(), application = %self.name, "runner service created");

        self.sessions.lock().push(session.clone());
        Ok(ServiceHandle { session, cache: self.cache.clone() })
    }

    /// Close sessions, unregister the application, and delete the archive
    /// from storage and disk. Every step runs; failures are logged and do
    /// not abort the remaining steps.
    pub async fn teardown(&mut self) {
        let sessions: Vec<Session> = self.sessions.lock().drain(..).collect();
        for session in sessions {
            if let Err(e) = session.close().await {
                error!(session_id = %session.id(), "error closing service session: {e}");
            }
        }

        if self.registered {
            match self.conn.unregister_application(&self.name).await {
                Ok(()) => self.registered = false,
                Err(e) => error!(application = %self.name, "error unregistering: {e}"),
            }
        }

        if let Err(e) = self.storage.delete(&self.archive_name).await {
            error!("error deleting package from storage: {e}");
        }

        remove_local(&self.package_path);
        info!(application = %self.name, "runner torn down");
    }
}

fn remove_local(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            error!(package = %path.display(), "error removing local package: {e}");
        }
    }
}

/// Call proxy over one runner session.
///
/// Arguments travel as [`RunnerValue`]s: plain JSON, or references from
/// earlier [`ObjectFuture`]s so results chain without inlining.
pub struct ServiceHandle {
    session: Session,
    cache: CacheClient,
}

impl ServiceHandle {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Invoke `method` (or the execution object itself when `None`).
    pub fn call(
        &self,
        method: Option<&str>,
        args: Vec<RunnerValue>,
        kwargs: BTreeMap<String, RunnerValue>,
    ) -> Result<ObjectFuture, FlameError> {
        let request = match method {
            Some(name) => RunnerRequest::method(name, args),
            None => RunnerRequest::call(args),
        }
        .with_kwargs(kwargs);

        let handle = self.session.run_json(&request)?;
        Ok(ObjectFuture { handle, cache: self.cache.clone() })
    }

    /// Invoke a named method with positional arguments only.
    pub fn method(&self, name: &str, args: Vec<RunnerValue>) -> Result<ObjectFuture, FlameError> {
        self.call(Some(name), args, BTreeMap::new())
    }

    /// Invoke the execution object itself.
    pub fn invoke(&self, args: Vec<RunnerValue>) -> Result<ObjectFuture, FlameError> {
        self.call(None, args, BTreeMap::new())
    }

    pub async fn close(&self) -> Result<(), FlameError> {
        self.session.close().await
    }
}

/// A future resolving to an [`ObjectRef`] in the cache.
pub struct ObjectFuture {
    handle: TaskHandle,
    cache: CacheClient,
}

impl ObjectFuture {
    /// The bare reference; the form passed when chaining calls.
    pub async fn object_ref(self) -> Result<ObjectRef, FlameError> {
        let output = self
            .handle
            .result()
            .await?
            .ok_or_else(|| FlameError::internal("task completed without output"))?;
        ObjectRef::decode(&output)
    }

    /// Fetch the concrete value behind the reference.
    pub async fn get(self) -> Result<serde_json::Value, FlameError> {
        let cache = self.cache.clone();
        let mut r = self.object_ref().await?;
        let data = cache.get(&mut r).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Fetch and decode into a concrete type.
    pub async fn get_json<T: DeserializeOwned>(self) -> Result<T, FlameError> {
        let cache = self.cache.clone();
        let mut r = self.object_ref().await?;
        let data = cache.get(&mut r).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}
