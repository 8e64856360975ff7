// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flame-core: value types, error taxonomy, and configuration for the
//! Flame SDK. Everything that crosses a crate boundary lives here.

pub mod macros;

pub mod application;
pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod object;
pub mod session;
pub mod task;

pub use application::{
    Application, ApplicationAttributes, ApplicationSchema, ApplicationState, Shim,
};
pub use clock::{datetime_from_epoch_ms, epoch_ms, Clock, FakeClock, SystemClock};
pub use config::{
    FlameContext, PackageConfig, DEFAULT_FLAME_CACHE_ENDPOINT, DEFAULT_FLAME_ENDPOINT,
};
pub use error::{FlameError, FlameErrorCode};
pub use id::{short, validate_user_id, ApplicationId, SessionId, TaskId};
pub use object::ObjectRef;
pub use session::{Session, SessionAttributes, SessionState};
pub use task::{Event, Task, TaskState};
