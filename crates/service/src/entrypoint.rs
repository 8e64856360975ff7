// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed single-function service.
//!
//! Lets a user expose one function taking a declared input type and
//! returning a declared output type; the framing decodes task input,
//! awaits the function on the harness runtime, and encodes the result.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use flame_core::FlameError;

use crate::context::{SessionContext, TaskContext};
use crate::harness::FlameService;

type Handler = Box<
    dyn FnMut(Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FlameError>> + Send>>
        + Send,
>;

/// A [`FlameService`] wrapping a single typed entrypoint function.
pub struct Entrypoint {
    name: String,
    handler: Handler,
    context: Option<SessionContext>,
}

impl Entrypoint {
    /// Wrap an asynchronous function `In -> Out`.
    pub fn new<F, Fut, In, Out>(name: impl Into<String>, mut func: F) -> Self
    where
        F: FnMut(In) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Out, FlameError>> + Send + 'static,
        In: DeserializeOwned + 'static,
        Out: Serialize + Send + 'static,
    {
        let handler: Handler = Box::new(move |bytes: Vec<u8>| {
            let input: In = match serde_json::from_slice(&bytes) {
                Ok(input) => input,
                Err(e) => {
                    let err = FlameError::invalid_argument(format!(
                        "cannot decode entrypoint input: {e}"
                    ));
                    return Box::pin(std::future::ready(Err(err)));
                }
            };
            let fut = func(input);
            Box::pin(async move {
                let output = fut.await?;
                serde_json::to_vec(&output).map_err(FlameError::from)
            })
        });
        Self { name: name.into(), handler, context: None }
    }

    /// Wrap a synchronous function `In -> Out`.
    pub fn blocking<F, In, Out>(name: impl Into<String>, mut func: F) -> Self
    where
        F: FnMut(In) -> Result<Out, FlameError> + Send + 'static,
        In: DeserializeOwned + 'static,
        Out: Serialize + Send + 'static,
    {
        Self::new(name, move |input| std::future::ready(func(input)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session's shared context, raw.
    pub async fn context(&self) -> Result<Option<Vec<u8>>, FlameError> {
        match &self.context {
            Some(ctx) => ctx.common_data().await,
            None => Ok(None),
        }
    }

    /// The session's shared context, decoded.
    pub async fn context_json<T: DeserializeOwned>(&self) -> Result<Option<T>, FlameError> {
        match &self.context {
            Some(ctx) => ctx.common_data_json().await,
            None => Ok(None),
        }
    }

    /// Re-put the session's shared context. A no-op outside a session.
    pub async fn update_context(&self, data: Vec<u8>) -> Result<(), FlameError> {
        match &self.context {
            Some(ctx) => ctx.update_common_data(data).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FlameService for Entrypoint {
    async fn on_session_enter(&mut self, context: SessionContext) -> Result<(), FlameError> {
        self.context = Some(context);
        Ok(())
    }

    async fn on_task_invoke(
        &mut self,
        context: TaskContext,
    ) -> Result<Option<Vec<u8>>, FlameError> {
        let input = context
            .input
            .ok_or_else(|| FlameError::invalid_argument("entrypoint requires task input"))?;
        let output = (self.handler)(input).await?;
        Ok(Some(output))
    }

    async fn on_session_leave(&mut self) -> Result<(), FlameError> {
        self.context = None;
        Ok(())
    }

    fn entrypoints(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

#[cfg(test)]
#[path = "entrypoint_tests.rs"]
mod tests;
