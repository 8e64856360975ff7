// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The prebuilt runner service executed on worker instances.
//!
//! Executes arbitrary registered methods against execution state shipped
//! via the session's shared context. Arguments may arrive as cache
//! references; the service resolves them before dispatch and returns every
//! result by reference, so callers chain without inlining payloads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use flame_cache::CacheClient;
use flame_core::{FlameError, ObjectRef};
use flame_service::{FlameService, SessionContext, TaskContext};

use crate::package;
use crate::registry::{Args, Kwargs, MethodRegistry};
use crate::types::{RunnerContext, RunnerRequest, RunnerValue};

/// Hook making an unpacked code bundle usable by the host environment.
///
/// The default does nothing beyond checking the path: for this runner the
/// extracted directory itself is the code path. Environments with a real
/// install step (building, linking into a venv-equivalent) plug in here.
pub trait PackageInstaller: Send + Sync {
    fn install(&self, path: &Path) -> Result<(), FlameError>;
}

/// Default installer: verify the bundle exists and leave it in place.
pub struct UnpackInstaller;

impl PackageInstaller for UnpackInstaller {
    fn install(&self, path: &Path) -> Result<(), FlameError> {
        if !path.exists() {
            return Err(FlameError::invalid_config(format!(
                "package path not found: {}",
                path.display()
            )));
        }
        info!(path = %path.display(), "package installed");
        Ok(())
    }
}

/// Generic remote-method dispatch service.
pub struct RunnerService {
    registry: MethodRegistry,
    cache: CacheClient,
    installer: Box<dyn PackageInstaller>,
    workdir: PathBuf,
    session: Option<SessionContext>,
}

impl RunnerService {
    pub fn new(registry: MethodRegistry, cache: CacheClient) -> Self {
        Self {
            registry,
            cache,
            installer: Box::new(UnpackInstaller),
            workdir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            session: None,
        }
    }

    pub fn with_installer(mut self, installer: Box<dyn PackageInstaller>) -> Self {
        self.installer = installer;
        self
    }

    /// Override where archives are extracted (defaults to the process cwd).
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Resolve the application's code URL: extract archives into the
    /// working directory, then hand the directory to the installer.
    /// Only `file://` is supported here.
    fn install_from_url(&self, url: &str) -> Result<(), FlameError> {
        info!(%url, "installing package");

        let path = url.strip_prefix("file://").map(Path::new).ok_or_else(|| {
            FlameError::invalid_config(format!(
                "unsupported package URL scheme in {url:?}; only file:// is supported"
            ))
        })?;

        if !path.exists() {
            return Err(FlameError::invalid_config(format!(
                "package path not found: {}",
                path.display()
            )));
        }

        if path.is_file() && package::is_archive(path) {
            let stem = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = stem.split('.').next().unwrap_or("package").to_string();
            let dest = self.workdir.join(format!("extracted_{stem}"));
            package::extract_archive(path, &dest)?;
            self.installer.install(&dest)
        } else if path.is_dir() {
            self.installer.install(path)
        } else {
            Err(FlameError::invalid_config(format!(
                "package path is neither an archive nor a directory: {}",
                path.display()
            )))
        }
    }

    async fn resolve(&self, value: RunnerValue) -> Result<serde_json::Value, FlameError> {
        match value {
            RunnerValue::Plain(v) => Ok(v),
            RunnerValue::Ref(mut r) => {
                debug!(url = ?r.url, version = r.version, "resolving argument reference");
                let data = self.cache.get(&mut r).await?;
                Ok(serde_json::from_slice(&data)?)
            }
        }
    }
}

#[async_trait]
impl FlameService for RunnerService {
    async fn on_session_enter(&mut self, context: SessionContext) -> Result<(), FlameError> {
        info!(session_id = %context.session_id, "entering session");

        if let Some(url) = context.application.spec.url.clone() {
            self.install_from_url(&url)?;
        }

        self.session = Some(context);
        Ok(())
    }

    async fn on_task_invoke(
        &mut self,
        context: TaskContext,
    ) -> Result<Option<Vec<u8>>, FlameError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| FlameError::invalid_state("no active session"))?;

        let request: RunnerRequest = context.input_json()?;

        // Re-read the shared context each task so state written by other
        // instances of the session is visible here.
        let mut runner: RunnerContext = session.common_data_json().await?.ok_or_else(|| {
            FlameError::invalid_argument("session carries no runner context")
        })?;

        let mut args = Args::new();
        for value in request.args.unwrap_or_default() {
            args.push(self.resolve(value).await?);
        }
        let mut kwargs = Kwargs::new();
        for (key, value) in request.kwargs.unwrap_or_default() {
            kwargs.insert(key, self.resolve(value).await?);
        }

        let result =
            self.registry.dispatch(&mut runner.state, request.method.as_deref(), args, kwargs)?;

        // Persist mutated state so subsequent tasks observe it.
        if runner.stateful {
            session.update_common_data_json(&runner).await?;
        }

        let output: ObjectRef =
            self.cache.put_json(context.session_id.as_str(), &result).await?;
        debug!(task_id = %context.task_id, "result cached");
        Ok(Some(output.encode()?))
    }

    async fn on_session_leave(&mut self) -> Result<(), FlameError> {
        if let Some(session) = self.session.take() {
            info!(session_id = %session.session_id, "leaving session");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
