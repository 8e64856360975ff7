// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the Flame frontend.
//!
//! Each RPC opens its own framed stream on the shared address; the
//! transport multiplex of the spec is simply one short-lived connection
//! per call, plus a long-lived one per task watcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::debug;

use flame_cache::CacheClient;
use flame_core::{Application, FlameContext, FlameError, SessionAttributes, SessionId};
use flame_wire::{FrontendRequest, FrontendResponse, SessionSpec};

use crate::session::Session;
use crate::watcher::TaskWatcher;

/// Size of the worker pool backing [`Session::run`](crate::Session::run).
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Timeout for unary RPCs (watch streams are unbounded between snapshots).
fn rpc_timeout() -> Duration {
    std::env::var("FLAME_RPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Timeout for the initial reachability probe.
fn connect_timeout() -> Duration {
    std::env::var("FLAME_CONNECT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

#[derive(Debug)]
pub(crate) struct ConnectionInner {
    pub(crate) addr: String,
    pub(crate) cache: CacheClient,
    pub(crate) pool: Arc<Semaphore>,
}

/// Handle to the Flame frontend.
///
/// Cheap to clone; all clones share the worker pool and cache client.
#[derive(Clone, Debug)]
pub struct Connection {
    pub(crate) inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Connect to the frontend at `addr` (`host:port`), probing reachability.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, FlameError> {
        Self::connect_with_cache(addr, CacheClient::new(None)).await
    }

    /// Connect using a loaded [`FlameContext`] for endpoint and cache.
    pub async fn from_context(ctx: &FlameContext) -> Result<Self, FlameError> {
        Self::connect_with_cache(ctx.endpoint.clone(), CacheClient::from_context(ctx)).await
    }

    async fn connect_with_cache(
        addr: impl Into<String>,
        cache: CacheClient,
    ) -> Result<Self, FlameError> {
        let addr = addr.into();
        if addr.is_empty() {
            return Err(FlameError::invalid_config("address cannot be empty"));
        }

        // Reachability probe; per-RPC streams are opened lazily afterwards.
        let probe = tokio::time::timeout(connect_timeout(), TcpStream::connect(&addr)).await;
        match probe {
            Ok(Ok(_stream)) => {}
            Ok(Err(e)) => {
                return Err(FlameError::invalid_config(format!(
                    "failed to connect to {addr}: {e}"
                )));
            }
            Err(_) => {
                return Err(FlameError::invalid_config(format!(
                    "timeout connecting to {addr}"
                )));
            }
        }
        debug!(%addr, "connected to frontend");

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                addr,
                cache,
                pool: Arc::new(Semaphore::new(DEFAULT_POOL_SIZE)),
            }),
        })
    }

    /// The frontend address this connection talks to.
    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    pub(crate) fn cache(&self) -> &CacheClient {
        &self.inner.cache
    }

    /// Shut the worker pool down, awaiting in-flight `run` submissions.
    ///
    /// Closing a session does not close the connection; closing the
    /// connection fails any `run` submitted afterwards.
    pub async fn close(&self) {
        // Draining all permits waits for every spawned invocation to finish.
        let _drained = self.inner.pool.acquire_many(DEFAULT_POOL_SIZE as u32).await;
        self.inner.pool.close();
    }

    /// One request frame, one response frame.
    pub(crate) async fn call(
        &self,
        request: &FrontendRequest,
    ) -> Result<FrontendResponse, FlameError> {
        let stream = TcpStream::connect(&self.inner.addr)
            .await
            .map_err(|e| FlameError::internal(format!("frontend unreachable: {e}")))?;
        let (mut reader, mut writer) = stream.into_split();

        flame_wire::write_frame(&mut writer, request, rpc_timeout()).await?;
        let response = flame_wire::read_frame(&mut reader, rpc_timeout()).await?;

        match response {
            FrontendResponse::Error { code, message } => Err(FlameError::new(code, message)),
            other => Ok(other),
        }
    }

    /// Open a watch stream: one request frame, then `Task` frames until
    /// a terminal snapshot.
    pub(crate) async fn open_watch(
        &self,
        session_id: &str,
        task_id: &str,
    ) -> Result<TaskWatcher, FlameError> {
        let stream = TcpStream::connect(&self.inner.addr)
            .await
            .map_err(|e| FlameError::internal(format!("frontend unreachable: {e}")))?;
        let (reader, mut writer) = stream.into_split();

        let request = FrontendRequest::WatchTask {
            session_id: session_id.to_string(),
            task_id: task_id.to_string(),
        };
        flame_wire::write_frame(&mut writer, &request, rpc_timeout()).await?;

        Ok(TaskWatcher::new(reader, writer))
    }

    /// Register a new application (idempotent).
    pub async fn register_application(
        &self,
        name: impl Into<String>,
        attrs: flame_core::ApplicationAttributes,
    ) -> Result<(), FlameError> {
        let request =
            FrontendRequest::RegisterApplication { name: name.into(), application: attrs };
        match self.call(&request).await? {
            FrontendResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Unregister an application.
    pub async fn unregister_application(&self, name: &str) -> Result<(), FlameError> {
        let request = FrontendRequest::UnregisterApplication { name: name.to_string() };
        match self.call(&request).await? {
            FrontendResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get an application by name.
    pub async fn get_application(&self, name: &str) -> Result<Application, FlameError> {
        let request = FrontendRequest::GetApplication { name: name.to_string() };
        match self.call(&request).await? {
            FrontendResponse::Application { application } => Ok(application.into()),
            other => Err(unexpected(other)),
        }
    }

    /// List all applications.
    pub async fn list_applications(&self) -> Result<Vec<Application>, FlameError> {
        match self.call(&FrontendRequest::ListApplication).await? {
            FrontendResponse::Applications { applications } => {
                Ok(applications.into_iter().map(Application::from).collect())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Create a new session.
    ///
    /// When no ID is supplied one is generated from the application name.
    /// `common_data` goes through the object cache; without a configured
    /// cache the reference travels inline on the wire.
    pub async fn create_session(&self, attrs: SessionAttributes) -> Result<Session, FlameError> {
        attrs.validate()?;

        let session_id = match &attrs.id {
            Some(id) => id.clone(),
            None => SessionId::generate(&attrs.application).to_string(),
        };

        let common_data = match attrs.common_data {
            Some(bytes) => {
                let r = self.inner.cache.put(&session_id, bytes).await?;
                Some(r.encode()?)
            }
            None => None,
        };

        let spec =
            SessionSpec { application: attrs.application, slots: attrs.slots, common_data };
        let request = FrontendRequest::CreateSession { session_id, session: spec };
        self.session_response(request).await
    }

    /// Open an existing session, or create it when absent and `spec` given.
    ///
    /// Fails `invalid_state` when the session exists with a different spec,
    /// `not_found` when absent and no spec was supplied.
    pub async fn open_session(
        &self,
        session_id: &str,
        spec: Option<SessionAttributes>,
    ) -> Result<Session, FlameError> {
        flame_core::validate_user_id(session_id)?;

        let session = match spec {
            Some(attrs) => {
                attrs.validate()?;
                let common_data = match attrs.common_data {
                    Some(bytes) => {
                        let r = self.inner.cache.put(session_id, bytes).await?;
                        Some(r.encode()?)
                    }
                    None => None,
                };
                Some(SessionSpec {
                    application: attrs.application,
                    slots: attrs.slots,
                    common_data,
                })
            }
            None => None,
        };

        let request =
            FrontendRequest::OpenSession { session_id: session_id.to_string(), session };
        self.session_response(request).await
    }

    /// Get a session by ID.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, FlameError> {
        let request = FrontendRequest::GetSession { session_id: session_id.to_string() };
        self.session_response(request).await
    }

    /// List all sessions.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, FlameError> {
        match self.call(&FrontendRequest::ListSession).await? {
            FrontendResponse::Sessions { sessions } => sessions
                .into_iter()
                .map(|desc| {
                    let record = flame_core::Session::try_from(desc)?;
                    Ok(Session::hydrate(self.clone(), record))
                })
                .collect(),
            other => Err(unexpected(other)),
        }
    }

    /// Close a session. A no-op when the session is already closed.
    pub async fn close_session(&self, session_id: &str) -> Result<Session, FlameError> {
        let request = FrontendRequest::CloseSession { session_id: session_id.to_string() };
        self.session_response(request).await
    }

    async fn session_response(&self, request: FrontendRequest) -> Result<Session, FlameError> {
        match self.call(&request).await? {
            FrontendResponse::Session { session } => {
                let record = flame_core::Session::try_from(session)?;
                Ok(Session::hydrate(self.clone(), record))
            }
            other => Err(unexpected(other)),
        }
    }

}

pub(crate) fn unexpected(resp: FrontendResponse) -> FlameError {
    FlameError::internal(format!("unexpected response from frontend: {resp:?}"))
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
