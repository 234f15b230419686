// SPDX-License-Identifier: MIT

//! Ollama Model - local `/api/chat` implementation

use super::{function_declarations, Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::error::Error;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model served by a local or remote Ollama instance
pub struct OllamaModel {
    client: Client,
    model_name: String,
    base_url: String,
}

impl OllamaModel {
    /// Create a new OllamaModel
    ///
    /// Uses `OLLAMA_BASE_URL` when set, `http://localhost:11434` otherwise.
    pub fn new(model_name: String) -> Self {
        let base_url = env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(model_name, base_url)
    }

    pub fn with_base_url(model_name: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert internal Content to Ollama chat messages.
    ///
    /// Each function response becomes its own `tool` message.
    fn content_to_messages(content: &Content) -> Vec<Value> {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let mut messages = Vec::new();
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in &content.parts {
            match part {
                Part::Text(t) => text.push_str(t),
                Part::FunctionCall { name, args } => tool_calls.push(json!({
                    "function": { "name": name, "arguments": args }
                })),
                Part::FunctionResponse { name, response } => messages.push(json!({
                    "role": "tool",
                    "tool_name": name,
                    "content": serde_json::to_string(response).unwrap_or_default()
                })),
            }
        }

        if !text.is_empty() || !tool_calls.is_empty() {
            let mut message = json!({ "role": role, "content": text });
            if !tool_calls.is_empty() {
                message["tool_calls"] = json!(tool_calls);
            }
            messages.insert(0, message);
        }

        messages
    }

    fn parse_ollama_response(response: &Value) -> Result<Content, ModelError> {
        let message = response
            .get("message")
            .ok_or_else(|| ModelError::InvalidResponse("No message in Ollama response".into()))?;

        let mut parts = Vec::new();

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let name = tc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                // Ollama sends arguments as an object; some models emit a JSON string instead
                let args = match &tc["function"]["arguments"] {
                    Value::String(s) => serde_json::from_str(s).unwrap_or(json!({})),
                    Value::Null => json!({}),
                    other => other.clone(),
                };
                parts.push(Part::FunctionCall { name, args });
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OllamaModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/api/chat", self.base_url);

        let messages: Vec<Value> = history
            .iter()
            .flat_map(Self::content_to_messages)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "stream": false
        });

        if let Some(cfg) = config {
            let mut options = serde_json::Map::new();
            if let Some(temp) = cfg.temperature {
                options.insert("temperature".into(), json!(temp));
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                options.insert("num_predict".into(), json!(max_tokens));
            }
            if let Some(top_p) = cfg.top_p {
                options.insert("top_p".into(), json!(top_p));
            }
            if !options.is_empty() {
                body["options"] = Value::Object(options);
            }
            if cfg.json_output {
                body["format"] = json!("json");
            }
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(function_declarations(tools));
        }

        log::debug!(
            "Ollama request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ModelError::api("Ollama", format!("{}: {}", status, text)).into());
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Ollama response: {}", resp_json);

        Ok(Self::parse_ollama_response(&resp_json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_role_maps_to_assistant() {
        let messages = OllamaModel::content_to_messages(&Content::model("Hi"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[0]["content"], "Hi");
    }

    #[test]
    fn test_function_call_message() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![Part::FunctionCall {
                name: "book_appointments".to_string(),
                args: json!({"name": "Ana"}),
            }],
        };

        let messages = OllamaModel::content_to_messages(&content);
        assert_eq!(
            messages[0]["tool_calls"][0]["function"]["arguments"]["name"],
            "Ana"
        );
    }

    #[test]
    fn test_function_responses_become_tool_messages() {
        let content = Content {
            role: "user".to_string(),
            parts: vec![
                Part::FunctionResponse {
                    name: "search_appointments".to_string(),
                    response: json!({"id": "1"}),
                },
                Part::FunctionResponse {
                    name: "book_appointments".to_string(),
                    response: json!({"id": "2"}),
                },
            ],
        };

        let messages = OllamaModel::content_to_messages(&content);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m["role"] == "tool"));
        assert_eq!(messages[1]["tool_name"], "book_appointments");
    }

    #[test]
    fn test_parse_text_response() {
        let response = json!({
            "model": "llama3.2:1b",
            "message": { "role": "assistant", "content": "Olá!" },
            "done": true
        });
        let content = OllamaModel::parse_ollama_response(&response).unwrap();
        assert_eq!(content.text(), "Olá!");
    }

    #[test]
    fn test_parse_tool_call_with_string_arguments() {
        let response = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "function": { "name": "retrieve", "arguments": "{\"query\": \"AI\"}" }
                }]
            }
        });
        let content = OllamaModel::parse_ollama_response(&response).unwrap();
        assert_eq!(content.parts.len(), 1);
        match &content.parts[0] {
            Part::FunctionCall { name, args } => {
                assert_eq!(name, "retrieve");
                assert_eq!(args["query"], "AI");
            }
            _ => panic!("Expected FunctionCall part"),
        }
    }

    #[test]
    fn test_parse_missing_message() {
        assert!(OllamaModel::parse_ollama_response(&json!({"done": true})).is_err());
    }
}
