// SPDX-License-Identifier: MIT

//! Tool-calling agent backed by a [`Model`]

use super::Agent;
use crate::adk::error::BoxError;
use crate::adk::model::{Content, GenerationConfig, Model, Part};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Model round-trips allowed before the agent gives up
const MAX_TURNS: usize = 10;

/// Agent that alternates model calls and tool executions until the model
/// answers with text.
pub struct LLMAgent {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub config: Option<GenerationConfig>,
    by_name: HashMap<String, Arc<dyn Tool>>,
}

impl LLMAgent {
    pub fn new(
        name: String,
        description: String,
        instruction: String,
        model: Arc<dyn Model>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        let by_name = tools
            .iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();

        Self {
            name,
            description,
            instruction,
            model,
            tools,
            config: None,
            by_name,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Execute one requested call; failures are reported back to the model as data
    async fn call_tool(&self, name: &str, args: &Value) -> Value {
        let Some(tool) = self.by_name.get(name) else {
            log::error!("Agent {} asked for unknown tool {}", self.name, name);
            return json!({ "error": format!("Tool {} not found", name) });
        };

        log::info!("Agent {} calling {} with {}", self.name, name, args);
        match tool.execute(args.clone()).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Tool {} failed: {}", name, e);
                json!({ "error": e.to_string() })
            }
        }
    }
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String, BoxError> {
        let mut history = vec![Content::system(self.instruction.clone()), Content::user(input)];

        for turn in 1..=MAX_TURNS {
            let response = self
                .model
                .generate_content(&history, self.config.as_ref(), Some(&self.tools))
                .await?;

            let text = response.text();
            if !text.is_empty() {
                log::debug!("Agent {} answered on turn {}", self.name, turn);
                return Ok(text);
            }

            let calls = response.function_calls();
            if calls.is_empty() {
                log::warn!("Agent {} got neither text nor tool calls", self.name);
                return Ok(String::new());
            }

            let mut responses = Vec::with_capacity(calls.len());
            for (name, args) in calls {
                responses.push(Part::FunctionResponse {
                    name: name.to_string(),
                    response: self.call_tool(name, args).await,
                });
            }

            history.push(response);
            history.push(Content {
                role: "user".to_string(),
                parts: responses,
            });
        }

        log::error!("Agent {} gave up after {} turns", self.name, MAX_TURNS);
        Err(format!("Agent {} reached {} turns without an answer", self.name, MAX_TURNS).into())
    }
}
