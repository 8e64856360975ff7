// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value types shared between the runner service and its callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use flame_core::{FlameError, ObjectRef};

/// Session-wide context of a runner application.
///
/// Carries the execution state (the serialized execution object) plus the
/// derived instance policy, and travels as the session's `common_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerContext {
    /// Serialized execution state the registry handlers operate on.
    pub state: serde_json::Value,
    /// Persist the state back to the cache after each task.
    #[serde(default)]
    pub stateful: bool,
    /// Scale instances with pending tasks instead of pinning one.
    #[serde(default = "default_autoscale")]
    pub autoscale: bool,
    pub min_instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
}

fn default_autoscale() -> bool {
    true
}

impl RunnerContext {
    /// Build a context, deriving the instance policy:
    /// `autoscale` means `[0, ∞]` instances, otherwise exactly one.
    ///
    /// A stateful context must carry state: `stateful = true` with a null
    /// state has nothing to persist and is rejected.
    pub fn new(
        state: serde_json::Value,
        stateful: bool,
        autoscale: bool,
    ) -> Result<Self, FlameError> {
        if stateful && state.is_null() {
            return Err(FlameError::invalid_state(
                "cannot set stateful without execution state; only stateful objects carry state",
            ));
        }

        let (min_instances, max_instances) = if autoscale { (0, None) } else { (1, Some(1)) };
        Ok(Self { state, stateful, autoscale, min_instances, max_instances })
    }
}

/// One argument or keyword value of a [`RunnerRequest`].
///
/// References are resolved through the object cache before invocation;
/// plain values pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RunnerValue {
    Ref(ObjectRef),
    Plain(serde_json::Value),
}

impl RunnerValue {
    pub fn plain<T: Serialize>(value: &T) -> Result<Self, FlameError> {
        Ok(Self::Plain(serde_json::to_value(value)?))
    }

    pub fn from_ref(r: ObjectRef) -> Self {
        Self::Ref(r)
    }
}

/// Input of one runner task: which method to invoke and with what.
///
/// `method = None` invokes the execution object itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<RunnerValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<BTreeMap<String, RunnerValue>>,
}

impl RunnerRequest {
    /// Invoke the execution object itself.
    pub fn call(args: Vec<RunnerValue>) -> Self {
        Self { method: None, args: (!args.is_empty()).then_some(args), kwargs: None }
    }

    /// Invoke a named method on the execution object.
    pub fn method(name: impl Into<String>, args: Vec<RunnerValue>) -> Self {
        Self {
            method: Some(name.into()),
            args: (!args.is_empty()).then_some(args),
            kwargs: None,
        }
    }

    pub fn with_kwargs(mut self, kwargs: BTreeMap<String, RunnerValue>) -> Self {
        self.kwargs = (!kwargs.is_empty()).then_some(kwargs);
        self
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
