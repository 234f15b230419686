// SPDX-License-Identifier: MIT

//! Classifier node: picks the handlers for a query and writes sub-queries for them

use super::classification::{ClassificationOutput, ClassifierResponse, RuleClassifier};
use crate::adk::error::{BoxError, NodeError};
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::triage::graph::{Node, NodeInput};
use crate::triage::state::StateUpdate;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

fn instructions(query: &str) -> String {
    format!(
        r#"Role:
You're a source classifier that interprets a query or request, chooses the correct sources
and writes an optimized sub-query for each of them.

Output:
You MUST respond with ONLY valid JSON matching this schema:
{{"classification": {{"source": "appointments" | "medical-qa" | "blog", "query": string}}}}
When the request needs more than one source, "classification" may be a list of such objects.

Task:
Extract the following from the original query: {query}
- Patient name (if mentioned)
- Date/time references
- Appointment actions (book, check, cancel, search, consult etc.)

Choose sources:
- Use "appointments" for booking, checking, searching, canceling or modifying appointments:
  {{"classification": {{"source": "appointments", "query": "Search appointment for Roberto"}}}}
- Use "medical-qa" for symptoms, medical advice, treatment options, health information:
  {{"classification": {{"source": "medical-qa", "query": "Headache treatment options"}}}}
- Use "blog" for any other subject related to healthcare technology and industry trends:
  {{"classification": {{"source": "blog", "query": "Why AI still isn't fixing patient referrals"}}}}
- If the query doesn't relate to any source, answer:
  {{"classification": null}}"#
    )
}

#[derive(Debug, Deserialize)]
struct ClassifierInput {
    query: String,
}

/// Classifies with a model, falling back to keyword rules when the model fails
pub struct ClassifierNode {
    model: Arc<dyn Model>,
    config: GenerationConfig,
    rules: RuleClassifier,
}

impl ClassifierNode {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            config: GenerationConfig {
                temperature: Some(0.0),
                json_output: true,
                ..Default::default()
            },
            rules: RuleClassifier,
        }
    }

    /// Override generation settings; JSON output is always requested
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = GenerationConfig {
            json_output: true,
            ..config
        };
        self
    }

    async fn classify_with_model(
        &self,
        query: &str,
    ) -> Result<Option<ClassificationOutput>, BoxError> {
        let history = vec![Content::system(instructions(query)), Content::user(query)];
        let response = self
            .model
            .generate_content(&history, Some(&self.config), None)
            .await?;
        let parsed = parse_response(&response.text())?;
        Ok(parsed.classification)
    }
}

/// Parse the model's answer, tolerating prose or code fences around the JSON object
pub fn parse_response(text: &str) -> Result<ClassifierResponse, serde_json::Error> {
    let trimmed = text.trim();
    let json_slice = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    serde_json::from_str(json_slice)
}

#[async_trait]
impl Node for ClassifierNode {
    async fn run(&self, input: NodeInput) -> Result<StateUpdate, NodeError> {
        let ClassifierInput { query } = input.parse()?;
        log::info!("Classifying query: {}", query);

        let classification = match self.classify_with_model(&query).await {
            Ok(classification) => classification,
            Err(e) => {
                log::warn!("Classifier model failed ({}), using keyword rules", e);
                self.rules.classify(&query)
            }
        };

        match &classification {
            Some(c) => log::info!("Classification: {:?}", c),
            None => log::info!("No handler matched the query"),
        }

        let mut update = StateUpdate::new();
        update.insert(
            "classification".to_string(),
            serde_json::to_value(classification)?,
        );
        Ok(update)
    }
}
