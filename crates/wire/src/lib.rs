// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the Flame SDK.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. The same
//! framing carries two channels: the frontend channel driven by clients
//! (request/response, plus streamed `Task` frames for `WatchTask`) and the
//! instance endpoint served by workers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod frontend;
mod instance;

pub use frame::{
    decode, encode, read_frame, read_message, write_frame, write_message, ProtocolError,
    DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
};
pub use frontend::{
    ApplicationDesc, EventDesc, FrontendRequest, FrontendResponse, SessionDesc, SessionSpec,
    TaskDesc, TaskSpec,
};
pub use instance::{InstanceRequest, InstanceResponse};
