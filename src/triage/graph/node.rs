// SPDX-License-Identifier: MIT

//! Node contract and adapters

use crate::adk::error::NodeError;
use crate::triage::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// Input handed to a node for one activation
#[derive(Debug, Clone)]
pub struct NodeInput {
    /// Snapshot of the state at the start of the pulse
    pub state: WorkflowState,
    /// Router-supplied input when the node was reached through a conditional edge
    pub payload: Option<Value>,
}

impl NodeInput {
    pub fn new(state: WorkflowState, payload: Option<Value>) -> Self {
        Self { state, payload }
    }

    /// Deserialize the node's view of its input: the routed payload if there is
    /// one, otherwise the whole state.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, NodeError> {
        let value = match &self.payload {
            Some(payload) => payload.clone(),
            None => self.state.to_json(),
        };
        Ok(serde_json::from_value(value)?)
    }

    /// True when the node was activated by a conditional router
    pub fn is_routed(&self) -> bool {
        self.payload.is_some()
    }
}

/// A named asynchronous unit of work in the graph
#[async_trait]
pub trait Node: Send + Sync {
    /// Run the node and return a partial state update
    async fn run(&self, input: NodeInput) -> Result<StateUpdate, NodeError>;
}

/// Adapter turning an async closure into a [`Node`]
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(NodeInput) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StateUpdate, NodeError>> + Send,
{
    async fn run(&self, input: NodeInput) -> Result<StateUpdate, NodeError> {
        (self.f)(input).await
    }
}

/// Convert a JSON object into a partial state update
pub fn into_update(value: Value) -> Result<StateUpdate, NodeError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(StateUpdate::new()),
        other => Err(NodeError::InvalidOutput(format!(
            "expected an object, got {}",
            other
        ))),
    }
}
