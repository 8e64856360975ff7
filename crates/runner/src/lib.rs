// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flame-runner: remote-method dispatch over a shared execution state.
//!
//! The worker side is a prebuilt [`RunnerService`] that resolves cached
//! references in task arguments and dispatches them through a
//! [`MethodRegistry`] against state shipped via the session's shared
//! context. The client side is the [`Runner`] deployer: it packages the
//! working directory, registers a one-off application, and exposes calls
//! as [`ObjectFuture`]s that chain by reference instead of inlined data.

mod deploy;
mod exec;
mod package;
mod registry;
mod storage;
mod types;

pub use deploy::{ObjectFuture, Runner, RunnerOptions, ServiceHandle, FLMRUN_TEMPLATE};
pub use exec::{PackageInstaller, RunnerService, UnpackInstaller};
pub use package::{extract_archive, is_archive, package_working_dir};
pub use registry::{Args, Kwargs, MethodRegistry};
pub use storage::{storage_for, FileStorage, HttpStorage, StorageBackend};
pub use types::{RunnerContext, RunnerRequest, RunnerValue};
