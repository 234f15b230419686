// SPDX-License-Identifier: MIT

//! Agents answer one query string with one answer string.
//!
//! Handlers in the triage workflow hold an `Arc<dyn Agent>`, so anything that
//! can turn a query into text (an [`LLMAgent`], a canned responder in tests)
//! plugs in the same way.

mod llm;

pub use llm::LLMAgent;

use crate::adk::error::BoxError;
use async_trait::async_trait;

#[async_trait]
pub trait Agent: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn run(&self, input: String) -> Result<String, BoxError>;
}
