// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flame-service: the instance-side harness.
//!
//! A long-running worker process serves the three instance RPCs —
//! `SessionEnter`, `TaskInvoke`, `SessionLeave` — over a local stream
//! socket advertised via `$FLAME_INSTANCE_ENDPOINT`, dispatching them to a
//! user-provided [`FlameService`]. Without the endpoint variable the
//! process starts a local HTTP debug listener instead.

mod context;
mod debug;
mod entrypoint;
mod harness;

pub use context::{SessionContext, TaskContext};
pub use debug::DEFAULT_DEBUG_PORT;
pub use entrypoint::Entrypoint;
pub use harness::{run, FlameService, InstanceServer, FLAME_INSTANCE_ENDPOINT};
