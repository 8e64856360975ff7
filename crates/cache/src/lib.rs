// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flame-cache: client for the content-addressed object cache.
//!
//! The cache backs a session's `common_data` and any payload too large to
//! inline on the frontend channel. Objects are versioned; updates are
//! last-writer-wins under optimistic version tags.

mod client;

pub use client::{CacheClient, CacheError, Object, ObjectMetadata};
