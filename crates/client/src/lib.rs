// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flame-client: connection and session API for the Flame frontend.
//!
//! A [`Connection`] owns the frontend address and a bounded worker pool; a
//! [`Session`] dispatches tasks over it, either blocking ([`Session::invoke`])
//! or through a future-returning submission ([`Session::run`]).

mod connection;
mod session;
mod watcher;

pub use connection::{Connection, DEFAULT_POOL_SIZE};
pub use session::{Informer, Session, TaskHandle, TaskInformer};
pub use watcher::TaskWatcher;

#[cfg(test)]
mod test_fixtures;
