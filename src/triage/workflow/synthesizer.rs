// SPDX-License-Identifier: MIT

//! Synthesizer node: turns the accumulated handler results into one answer

use super::handlers::HandlerResult;
use crate::adk::error::NodeError;
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::triage::graph::{Node, NodeInput};
use crate::triage::state::StateUpdate;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const NOTHING_FOUND: &str = "I couldn't find anything related to your request.";

const FALLBACK_DISCLAIMER: &str =
    "I could not put together a combined answer, so here is what each service returned:";

fn instructions(query: &str, results: &[HandlerResult]) -> String {
    let context = serde_json::to_string(results).unwrap_or_default();
    format!(
        r#"Role:
You are an assistant who interprets results written in JSON.

Context:
{context}

Task:
- Relate the context results to the original query: {query}
- Synthesize a final answer based on the context provided.
- Focus on clarity and coherence.

Constraints:
- Do not include any other text in the response.
- Do not be conclusive.
- Do not make assumptions outside the provided context.
- Propagate uncertainties from the context to the final answer.
- If the context has "References", include them in the final answer."#
    )
}

#[derive(Debug, Deserialize)]
struct SynthesizerInput {
    query: String,
    #[serde(default)]
    results: Vec<HandlerResult>,
}

/// Deterministic answer used when the model cannot synthesize one
pub fn fallback_answer(results: &[HandlerResult]) -> String {
    let mut answer = FALLBACK_DISCLAIMER.to_string();
    for r in results {
        answer.push_str(&format!("\n\n[{}] {}", r.source, r.result));
    }
    answer
}

pub struct SynthesizerNode {
    model: Arc<dyn Model>,
    config: Option<GenerationConfig>,
}

impl SynthesizerNode {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            config: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    async fn synthesize(&self, query: &str, results: &[HandlerResult]) -> String {
        let user = results
            .iter()
            .map(|r| r.result.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let history = vec![
            Content::system(instructions(query, results)),
            Content::user(user),
        ];

        match self
            .model
            .generate_content(&history, self.config.as_ref(), None)
            .await
        {
            Ok(content) if !content.text().trim().is_empty() => content.text(),
            Ok(_) => {
                log::warn!("Synthesizer model returned an empty answer, using raw results");
                fallback_answer(results)
            }
            Err(e) => {
                log::error!("Synthesizer model failed: {}, using raw results", e);
                fallback_answer(results)
            }
        }
    }
}

#[async_trait]
impl Node for SynthesizerNode {
    async fn run(&self, input: NodeInput) -> Result<StateUpdate, NodeError> {
        let SynthesizerInput { query, results } = input.parse()?;
        log::info!("Synthesizing answer from {} results", results.len());

        let answer = if results.is_empty() {
            NOTHING_FOUND.to_string()
        } else {
            self.synthesize(&query, &results).await
        };

        let mut update = StateUpdate::new();
        update.insert("finalAnswer".to_string(), Value::String(answer));
        Ok(update)
    }
}
