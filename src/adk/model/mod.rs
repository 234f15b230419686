// SPDX-License-Identifier: MIT

//! Chat model contract and the provider clients
//!
//! - [ollama] - local models served by Ollama
//! - [openai] - OpenAI-compatible chat completion APIs

pub mod ollama;
pub mod openai;

use crate::adk::error::BoxError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Sampling knobs forwarded to the provider; `None` leaves the provider default
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Ask the provider for a JSON object instead of free text
    #[serde(default)]
    pub json_output: bool,
}

/// One conversation turn; `role` is `system`, `user` or `model`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts of the message
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls requested in this message, in order
    pub fn function_calls(&self) -> Vec<(&str, &Value)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { name, args } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }
}

/// Tool declarations in the `{"type": "function", ...}` shape shared by Ollama and OpenAI
pub fn function_declarations(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.schema()
                }
            })
        })
        .collect()
}

/// One piece of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    FunctionCall {
        name: String,
        args: Value,
    },
    /// Result of a [`Part::FunctionCall`], sent back on the next turn
    FunctionResponse {
        name: String,
        response: Value,
    },
}

/// A chat model able to answer a history, optionally calling tools
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, BoxError>;
}
