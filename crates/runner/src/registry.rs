// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static method dispatch for the runner service.
//!
//! Where a dynamic language reflects over an execution object at runtime,
//! this registry maps method names to closures over the decoded execution
//! state, declared when the worker is built.

use std::collections::HashMap;

use flame_core::FlameError;

/// Positional arguments, already resolved from cache references.
pub type Args = Vec<serde_json::Value>;

/// Keyword arguments, already resolved from cache references.
pub type Kwargs = std::collections::BTreeMap<String, serde_json::Value>;

type Handler = Box<
    dyn Fn(&mut serde_json::Value, Args, Kwargs) -> Result<serde_json::Value, FlameError>
        + Send
        + Sync,
>;

/// Name-keyed handlers over the shared execution state.
#[derive(Default)]
pub struct MethodRegistry {
    direct: Option<Handler>,
    methods: HashMap<String, Handler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler invoked when a request names no method (the execution
    /// object itself is the callable).
    pub fn direct<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut serde_json::Value, Args, Kwargs) -> Result<serde_json::Value, FlameError>
            + Send
            + Sync
            + 'static,
    {
        self.direct = Some(Box::new(handler));
        self
    }

    /// Register a named method.
    pub fn method<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut serde_json::Value, Args, Kwargs) -> Result<serde_json::Value, FlameError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(name.into(), Box::new(handler));
        self
    }

    pub fn is_callable(&self) -> bool {
        self.direct.is_some()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Locate and invoke the target handler.
    ///
    /// An unknown method or a direct call without a direct handler fails
    /// `invalid_argument` without invoking anything.
    pub fn dispatch(
        &self,
        state: &mut serde_json::Value,
        method: Option<&str>,
        args: Args,
        kwargs: Kwargs,
    ) -> Result<serde_json::Value, FlameError> {
        match method {
            None => {
                let handler = self.direct.as_ref().ok_or_else(|| {
                    FlameError::invalid_argument("execution object is not callable")
                })?;
                handler(state, args, kwargs)
            }
            Some(name) => {
                let handler = self.methods.get(name).ok_or_else(|| {
                    FlameError::invalid_argument(format!(
                        "execution object has no method '{name}'"
                    ))
                })?;
                handler(state, args, kwargs)
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
