// SPDX-License-Identifier: MIT

//! Functions an [`LLMAgent`](crate::adk::agent::LLMAgent) can offer to its model

use crate::adk::error::BoxError;
use async_trait::async_trait;
use serde_json::Value;

/// A callable exposed to the model by name.
///
/// Metadata is borrowed: keep the name, description and parameter schema in
/// fields or statics so they are built once.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique within one agent
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the `input` object accepted by [`Tool::execute`]
    fn schema(&self) -> &Value;

    /// Errors are reported back to the model, not to the caller of the agent
    async fn execute(&self, input: Value) -> Result<Value, BoxError>;
}
