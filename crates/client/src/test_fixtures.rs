// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake frontend for client tests.
//!
//! Speaks the real wire protocol over TCP. Task behavior is scripted by the
//! input payload: `boom:<msg>` fails with `<msg>`, `slow:` delays the
//! terminal snapshot, anything else succeeds echoing the input back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;

use flame_core::{epoch_ms, FlameErrorCode, SessionState, TaskState};
use flame_wire::{
    ApplicationDesc, EventDesc, FrontendRequest, FrontendResponse, SessionDesc, TaskDesc,
    DEFAULT_TIMEOUT,
};

#[derive(Default)]
struct State {
    applications: HashMap<String, ApplicationDesc>,
    sessions: HashMap<String, SessionDesc>,
    // Scripted snapshot sequences keyed by "{session_id}/{task_id}".
    tasks: HashMap<String, Vec<TaskDesc>>,
    next_task: u64,
}

pub(crate) struct FakeFrontend {
    pub addr: String,
    state: Arc<Mutex<State>>,
}

impl FakeFrontend {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(Mutex::new(State::default()));

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn session(&self, id: &str) -> Option<SessionDesc> {
        self.state.lock().sessions.get(id).cloned()
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    state: Arc<Mutex<State>>,
) -> Result<(), flame_wire::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    let request: FrontendRequest = flame_wire::read_frame(&mut reader, DEFAULT_TIMEOUT).await?;

    if let FrontendRequest::WatchTask { session_id, task_id } = request {
        let snapshots = {
            let st = state.lock();
            st.tasks.get(&format!("{session_id}/{task_id}")).cloned()
        };
        match snapshots {
            Some(snapshots) => {
                for snapshot in snapshots {
                    if snapshot.input.as_deref().is_some_and(|i| i.starts_with(b"slow:"))
                        && snapshot.state.is_terminal()
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                    let frame = FrontendResponse::Task { task: snapshot };
                    flame_wire::write_frame(&mut writer, &frame, DEFAULT_TIMEOUT).await?;
                }
            }
            None => {
                let frame =
                    FrontendResponse::error(FlameErrorCode::NotFound, "task not found");
                flame_wire::write_frame(&mut writer, &frame, DEFAULT_TIMEOUT).await?;
            }
        }
        return Ok(());
    }

    let response = handle_request(request, &state);
    flame_wire::write_frame(&mut writer, &response, DEFAULT_TIMEOUT).await
}

fn handle_request(request: FrontendRequest, state: &Arc<Mutex<State>>) -> FrontendResponse {
    let mut st = state.lock();
    match request {
        FrontendRequest::RegisterApplication { name, application } => {
            let desc = ApplicationDesc {
                name: name.clone(),
                state: flame_core::ApplicationState::Enabled,
                creation_time: epoch_ms(),
                spec: application,
            };
            st.applications.insert(name, desc);
            FrontendResponse::Ok
        }

        FrontendRequest::UnregisterApplication { name } => {
            st.applications.remove(&name);
            FrontendResponse::Ok
        }

        FrontendRequest::GetApplication { name } => match st.applications.get(&name) {
            Some(app) => FrontendResponse::Application { application: app.clone() },
            None => FrontendResponse::error(
                FlameErrorCode::NotFound,
                format!("application {name} not found"),
            ),
        },

        FrontendRequest::ListApplication => FrontendResponse::Applications {
            applications: st.applications.values().cloned().collect(),
        },

        FrontendRequest::CreateSession { session_id, session } => {
            if st.sessions.contains_key(&session_id) {
                return FrontendResponse::error(
                    FlameErrorCode::InvalidState,
                    format!("session {session_id} already exists"),
                );
            }
            let desc = SessionDesc {
                id: session_id.clone(),
                application: session.application,
                slots: session.slots,
                state: SessionState::Open,
                creation_time: epoch_ms(),
                completion_time: None,
                pending: 0,
                running: 0,
                succeed: 0,
                failed: 0,
                common_data: session.common_data,
            };
            st.sessions.insert(session_id, desc.clone());
            FrontendResponse::Session { session: desc }
        }

        FrontendRequest::OpenSession { session_id, session } => {
            match st.sessions.get(&session_id) {
                Some(existing) => {
                    if existing.state == SessionState::Closed {
                        return FrontendResponse::error(
                            FlameErrorCode::InvalidState,
                            format!("session {session_id} is not open"),
                        );
                    }
                    if let Some(spec) = session {
                        if spec.application != existing.application {
                            return FrontendResponse::error(
                                FlameErrorCode::InvalidState,
                                "session spec mismatch: application differs",
                            );
                        }
                        if spec.slots != existing.slots {
                            return FrontendResponse::error(
                                FlameErrorCode::InvalidState,
                                format!(
                                    "session spec mismatch: slots {} != {}",
                                    spec.slots, existing.slots
                                ),
                            );
                        }
                    }
                    FrontendResponse::Session { session: existing.clone() }
                }
                None => match session {
                    Some(spec) => {
                        let desc = SessionDesc {
                            id: session_id.clone(),
                            application: spec.application,
                            slots: spec.slots,
                            state: SessionState::Open,
                            creation_time: epoch_ms(),
                            completion_time: None,
                            pending: 0,
                            running: 0,
                            succeed: 0,
                            failed: 0,
                            common_data: spec.common_data,
                        };
                        st.sessions.insert(session_id, desc.clone());
                        FrontendResponse::Session { session: desc }
                    }
                    None => FrontendResponse::error(
                        FlameErrorCode::NotFound,
                        format!("session {session_id} not found"),
                    ),
                },
            }
        }

        FrontendRequest::GetSession { session_id } => match st.sessions.get(&session_id) {
            Some(desc) => FrontendResponse::Session { session: desc.clone() },
            None => FrontendResponse::error(
                FlameErrorCode::NotFound,
                format!("session {session_id} not found"),
            ),
        },

        FrontendRequest::ListSession => {
            FrontendResponse::Sessions { sessions: st.sessions.values().cloned().collect() }
        }

        FrontendRequest::CloseSession { session_id } => match st.sessions.get_mut(&session_id) {
            Some(desc) => {
                if desc.state == SessionState::Open {
                    desc.state = SessionState::Closed;
                    desc.completion_time = Some(epoch_ms());
                }
                FrontendResponse::Session { session: desc.clone() }
            }
            None => FrontendResponse::error(
                FlameErrorCode::NotFound,
                format!("session {session_id} not found"),
            ),
        },

        FrontendRequest::CreateTask { task } => {
            let Some(session) = st.sessions.get(&task.session_id) else {
                return FrontendResponse::error(
                    FlameErrorCode::NotFound,
                    format!("session {} not found", task.session_id),
                );
            };
            if session.state == SessionState::Closed {
                return FrontendResponse::error(
                    FlameErrorCode::InvalidState,
                    format!("session {} is closed", task.session_id),
                );
            }
            st.next_task += 1;
            let task_id = format!("task-{}", st.next_task);
            let snapshots = script_task(&task_id, &task.session_id, task.input);
            let first = snapshots[0].clone();
            st.tasks.insert(format!("{}/{}", task.session_id, task_id), snapshots);
            FrontendResponse::Task { task: first }
        }

        FrontendRequest::GetTask { session_id, task_id } => {
            match st
                .tasks
                .get(&format!("{session_id}/{task_id}"))
                .and_then(|snapshots| snapshots.last())
            {
                Some(last) => FrontendResponse::Task { task: last.clone() },
                None => FrontendResponse::error(FlameErrorCode::NotFound, "task not found"),
            }
        }

        // Intercepted in handle_connection before reaching handle_request
        FrontendRequest::WatchTask { .. } => {
            FrontendResponse::error(FlameErrorCode::Internal, "unreachable")
        }
    }
}

/// Build the ordered snapshot sequence for a scripted task.
fn script_task(task_id: &str, session_id: &str, input: Option<Vec<u8>>) -> Vec<TaskDesc> {
    let now = epoch_ms();
    let base = TaskDesc {
        id: task_id.to_string(),
        session_id: session_id.to_string(),
        state: TaskState::Pending,
        creation_time: now,
        completion_time: None,
        input: input.clone(),
        output: None,
        events: vec![],
    };

    let mut running = base.clone();
    running.state = TaskState::Running;

    let mut terminal = base.clone();
    terminal.completion_time = Some(now + 1);
    match input.as_deref() {
        Some(payload) if payload.starts_with(b"boom:") => {
            let message = String::from_utf8_lossy(&payload[b"boom:".len()..]).into_owned();
            terminal.state = TaskState::Failed;
            terminal.events = vec![EventDesc {
                code: TaskState::Failed.code(),
                message,
                creation_time: now + 1,
            }];
        }
        _ => {
            terminal.state = TaskState::Succeed;
            terminal.output = input;
            terminal.events = vec![EventDesc {
                code: TaskState::Succeed.code(),
                message: String::new(),
                creation_time: now + 1,
            }];
        }
    }

    vec![base, running, terminal]
}
