// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance harness: the local-socket RPC server driving a user service.

use std::path::Path;

use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use flame_cache::CacheClient;
use flame_core::{Application, FlameContext, FlameError, ObjectRef};
use flame_wire::{InstanceRequest, InstanceResponse, ProtocolError, DEFAULT_TIMEOUT};

use crate::context::{SessionContext, TaskContext};
use crate::debug::run_debug;

/// Environment variable holding the instance socket path.
pub const FLAME_INSTANCE_ENDPOINT: &str = "FLAME_INSTANCE_ENDPOINT";

/// A user-provided service executed by the harness.
///
/// Ordering guarantees per instance: `on_session_enter` happens-before all
/// `on_task_invoke`, which run serially; `on_session_leave` happens-after
/// all returned invokes.
#[async_trait]
pub trait FlameService: Send {
    async fn on_session_enter(&mut self, context: SessionContext) -> Result<(), FlameError>;

    /// Execute one task; the returned bytes become the task output.
    async fn on_task_invoke(
        &mut self,
        context: TaskContext,
    ) -> Result<Option<Vec<u8>>, FlameError>;

    async fn on_session_leave(&mut self) -> Result<(), FlameError>;

    /// Entrypoint names exposed by the debug listener, if any.
    fn entrypoints(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Server for the instance endpoint.
pub struct InstanceServer<S> {
    service: S,
    cache: CacheClient,
}

impl<S: FlameService> InstanceServer<S> {
    pub fn new(service: S, cache: CacheClient) -> Self {
        Self { service, cache }
    }

    /// Serve at the path in `$FLAME_INSTANCE_ENDPOINT`.
    pub async fn serve(self) -> Result<(), FlameError> {
        let endpoint = std::env::var(FLAME_INSTANCE_ENDPOINT).map_err(|_| {
            FlameError::invalid_config(format!("{FLAME_INSTANCE_ENDPOINT} not found"))
        })?;
        self.serve_at(Path::new(&endpoint)).await
    }

    /// Serve at an explicit socket path until interrupted.
    ///
    /// Connections are handled one at a time, and requests within a
    /// connection strictly in order; the executor owns the callback
    /// sequencing, the harness just never reorders it.
    pub async fn serve_at(mut self, socket_path: &Path) -> Result<(), FlameError> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path).map_err(|e| {
                FlameError::invalid_config(format!(
                    "cannot remove stale socket {}: {e}",
                    socket_path.display()
                ))
            })?;
        }
        let listener = UnixListener::bind(socket_path).map_err(|e| {
            FlameError::invalid_config(format!(
                "cannot bind instance socket {}: {e}",
                socket_path.display()
            ))
        })?;
        info!(socket = %socket_path.display(), "instance service started");

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_token.cancel();
            }
        });

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("instance service shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            // In-flight calls finish before shutdown is observed.
                            self.handle_connection(stream).await;
                        }
                        Err(e) => error!("accept error: {e}"),
                    }
                }
            }
        }
    }

    async fn handle_connection(&mut self, stream: UnixStream) {
        let (mut reader, mut writer) = stream.into_split();
        loop {
            let request: InstanceRequest = match flame_wire::read_message(&mut reader).await {
                Ok(bytes) => match flame_wire::decode(&bytes) {
                    Ok(request) => request,
                    Err(e) => {
                        error!("undecodable instance request: {e}");
                        return;
                    }
                },
                Err(ProtocolError::ConnectionClosed) => {
                    debug!("executor disconnected");
                    return;
                }
                Err(e) => {
                    error!("instance read error: {e}");
                    return;
                }
            };

            let response = self.dispatch(request).await;
            if let Err(e) =
                flame_wire::write_frame(&mut writer, &response, DEFAULT_TIMEOUT).await
            {
                error!("instance write error: {e}");
                return;
            }
        }
    }

    async fn dispatch(&mut self, request: InstanceRequest) -> InstanceResponse {
        match request {
            InstanceRequest::SessionEnter { session_id, application, common_data } => {
                debug!(%session_id, "on_session_enter");
                let common_data = match common_data {
                    Some(bytes) => match ObjectRef::decode(&bytes) {
                        Ok(r) => Some(r),
                        Err(e) => return InstanceResponse::failed(e.message),
                    },
                    None => None,
                };
                let context = SessionContext::new(
                    session_id.into(),
                    Application::from(application),
                    common_data,
                    self.cache.clone(),
                );
                match self.service.on_session_enter(context).await {
                    Ok(()) => InstanceResponse::ok(),
                    Err(e) => {
                        warn!("on_session_enter failed: {e}");
                        InstanceResponse::failed(e.message)
                    }
                }
            }

            InstanceRequest::TaskInvoke { task_id, session_id, input } => {
                debug!(%task_id, %session_id, "on_task_invoke");
                let context = TaskContext {
                    task_id: task_id.into(),
                    session_id: session_id.into(),
                    input,
                };
                match self.service.on_task_invoke(context).await {
                    Ok(output) => InstanceResponse::task_ok(output),
                    Err(e) => {
                        warn!("on_task_invoke failed: {e}");
                        InstanceResponse::task_failed(e.message)
                    }
                }
            }

            InstanceRequest::SessionLeave => {
                debug!("on_session_leave");
                match self.service.on_session_leave().await {
                    Ok(()) => InstanceResponse::ok(),
                    Err(e) => {
                        warn!("on_session_leave failed: {e}");
                        InstanceResponse::failed(e.message)
                    }
                }
            }
        }
    }
}

/// Harness entry point for a service binary.
///
/// With `$FLAME_INSTANCE_ENDPOINT` set the instance serves the local
/// socket; otherwise it starts the HTTP debug listener for local
/// development (no schedule, no cache, synthetic session).
pub async fn run<S: FlameService + 'static>(service: S) -> Result<(), FlameError> {
    init_tracing();

    match std::env::var(FLAME_INSTANCE_ENDPOINT) {
        Ok(endpoint) => {
            let ctx = FlameContext::load()?;
            let cache = CacheClient::from_context(&ctx);
            InstanceServer::new(service, cache).serve_at(Path::new(&endpoint)).await
        }
        Err(_) => run_debug(service, crate::debug::DEFAULT_DEBUG_PORT).await,
    }
}

/// Install the process-wide subscriber; level from `FLAME_LOG_LEVEL`.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("FLAME_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
