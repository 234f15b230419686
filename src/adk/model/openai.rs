// SPDX-License-Identifier: MIT

//! OpenAI-compatible `/chat/completions` client

use super::{function_declarations, Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::error::Error;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    arguments: String,
}

/// OpenAI (or any compatible server) chat model
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL` (optional)
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ModelError::ApiKeyMissing("OpenAI".into()))?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::with_endpoint(model_name, api_key, base_url))
    }

    pub fn with_endpoint(model_name: String, api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One content may expand into several messages: every function response is
    /// its own `tool` message, keyed by the function name.
    fn to_messages(content: &Content) -> Vec<Value> {
        let role = if content.role == "model" {
            "assistant"
        } else {
            content.role.as_str()
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut tool_messages = Vec::new();

        for part in &content.parts {
            match part {
                Part::Text(t) => text.push_str(t),
                Part::FunctionCall { name, args } => tool_calls.push(json!({
                    "id": name,
                    "type": "function",
                    "function": { "name": name, "arguments": args.to_string() }
                })),
                Part::FunctionResponse { name, response } => tool_messages.push(json!({
                    "role": "tool",
                    "tool_call_id": name,
                    "content": response.to_string()
                })),
            }
        }

        let mut messages = Vec::with_capacity(1 + tool_messages.len());
        if !tool_calls.is_empty() {
            let content = if text.is_empty() { Value::Null } else { json!(text) };
            messages.push(json!({ "role": role, "content": content, "tool_calls": tool_calls }));
        } else if !text.is_empty() || tool_messages.is_empty() {
            messages.push(json!({ "role": role, "content": text }));
        }
        messages.extend(tool_messages);
        messages
    }

    fn request_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Value {
        let messages: Vec<Value> = history.iter().flat_map(Self::to_messages).collect();
        let mut body = json!({ "model": self.model_name, "messages": messages });

        if let Some(cfg) = config {
            if let Some(temperature) = cfg.temperature {
                body["temperature"] = json!(temperature);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if cfg.json_output {
                body["response_format"] = json!({ "type": "json_object" });
            }
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(function_declarations(tools));
            body["tool_choice"] = json!("auto");
        }

        body
    }

    fn parse_completion(completion: ChatCompletion) -> Result<Content, ModelError> {
        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let mut parts = Vec::new();
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            parts.push(Part::Text(text));
        }
        for call in message.tool_calls {
            let args = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                log::warn!("Unparsable arguments for {}: {}", call.function.name, e);
                json!({})
            });
            parts.push(Part::FunctionCall {
                name: call.function.name,
                args,
            });
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(history, config, tools);
        log::debug!("OpenAI request to {} with {} messages", url, history.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api("OpenAI", format!("{}: {}", status, text)).into());
        }

        let completion: ChatCompletion = resp
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        Ok(Self::parse_completion(completion)?)
    }
}
