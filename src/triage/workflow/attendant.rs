// SPDX-License-Identifier: MIT

//! The attendant workflow: classify, fan out to handlers, synthesize

use super::classification::{ClassificationOutput, HandlerId};
use super::classifier::ClassifierNode;
use super::handlers::{HandlerNode, HandlerResult};
use super::synthesizer::SynthesizerNode;
use crate::adk::agent::Agent;
use crate::adk::error::{GraphError, NodeError};
use crate::adk::model::{GenerationConfig, Model};
use crate::triage::graph::{CompiledGraph, Dispatch, GraphBuilder, GraphConfig, END, START};
use crate::triage::state::{FieldType, ReducerType, StateSchema, StateUpdate, WorkflowState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const CLASSIFY: &str = "classify";
pub const SYNTHESIZE: &str = "synthesize";

/// Handler taken when the classification names nothing
pub const FALLBACK_HANDLER: HandlerId = HandlerId::Blog;

/// Answer returned to the caller of [`AttendantWorkflow::invoke`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendantResponse {
    pub final_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationOutput>,
    pub results: Vec<HandlerResult>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    source: String,
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawClassificationOutput {
    Single(RawClassification),
    Multiple(Vec<RawClassification>),
}

/// Router on `classify`: one dispatch per classification, each with its own sub-query.
///
/// Sources are passed through by tag; an unknown tag is left for the conditional
/// edge to reject.
pub fn route_to_handlers(state: &WorkflowState) -> Vec<Dispatch> {
    let original = state.get_str("query").unwrap_or_default().to_string();
    let raw = match state.get("classification") {
        None | Some(Value::Null) => return Vec::new(),
        Some(value) => serde_json::from_value::<RawClassificationOutput>(value.clone()),
    };

    let items = match raw {
        Ok(RawClassificationOutput::Single(c)) => vec![c],
        Ok(RawClassificationOutput::Multiple(list)) => list,
        Err(e) => {
            log::warn!("Unreadable classification in state: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .map(|c| {
            let target = c
                .source
                .parse::<HandlerId>()
                .map(|id| id.as_str().to_string())
                .unwrap_or(c.source);
            log::debug!("Dispatching '{}' to {}", c.query, target);
            Dispatch::with_input(target, json!({ "query": c.query, "originalQuery": original }))
        })
        .collect()
}

/// State fields of the attendant graph
pub fn attendant_schema() -> StateSchema {
    StateSchema::new()
        .field("query", FieldType::String, ReducerType::Overwrite)
        .field("classification", FieldType::Object, ReducerType::Overwrite)
        .field_with_default("results", FieldType::Array, ReducerType::Append, json!([]))
        .field("finalAnswer", FieldType::String, ReducerType::Overwrite)
}

/// Compiled attendant graph; cheap to share across concurrent requests
pub struct AttendantWorkflow {
    graph: CompiledGraph,
}

impl AttendantWorkflow {
    pub fn builder() -> AttendantWorkflowBuilder {
        AttendantWorkflowBuilder::default()
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub async fn invoke(&self, query: &str) -> Result<AttendantResponse, GraphError> {
        self.invoke_with_cancel(query, CancellationToken::new()).await
    }

    pub async fn invoke_with_cancel(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<AttendantResponse, GraphError> {
        let mut seed = StateUpdate::new();
        seed.insert("query".to_string(), json!(query));

        let state = self.graph.invoke_with_cancel(seed, cancel).await?;

        let final_answer = state
            .get_str("finalAnswer")
            .map(str::to_string)
            .ok_or_else(|| {
                GraphError::node(SYNTHESIZE, NodeError::failed("run ended without a final answer"))
            })?;

        Ok(AttendantResponse {
            final_answer,
            classification: state.get_as("classification"),
            results: state.get_as("results").unwrap_or_default(),
        })
    }
}

/// Collects the collaborators of an [`AttendantWorkflow`]
#[derive(Default)]
pub struct AttendantWorkflowBuilder {
    classifier_model: Option<Arc<dyn Model>>,
    classifier_config: Option<GenerationConfig>,
    synthesizer_model: Option<Arc<dyn Model>>,
    synthesizer_config: Option<GenerationConfig>,
    handlers: HashMap<HandlerId, Arc<dyn Agent>>,
    graph_config: GraphConfig,
}

impl AttendantWorkflowBuilder {
    pub fn classifier_model(mut self, model: Arc<dyn Model>) -> Self {
        self.classifier_model = Some(model);
        self
    }

    pub fn classifier_config(mut self, config: GenerationConfig) -> Self {
        self.classifier_config = Some(config);
        self
    }

    pub fn synthesizer_model(mut self, model: Arc<dyn Model>) -> Self {
        self.synthesizer_model = Some(model);
        self
    }

    pub fn synthesizer_config(mut self, config: GenerationConfig) -> Self {
        self.synthesizer_config = Some(config);
        self
    }

    /// Register the agent behind a handler; a later registration replaces an earlier one
    pub fn handler(mut self, id: HandlerId, agent: Arc<dyn Agent>) -> Self {
        self.handlers.insert(id, agent);
        self
    }

    pub fn graph_config(mut self, config: GraphConfig) -> Self {
        self.graph_config = config;
        self
    }

    pub fn build(mut self) -> Result<AttendantWorkflow, GraphError> {
        let classifier_model = self
            .classifier_model
            .ok_or_else(|| GraphError::config("classifier model is required"))?;
        let synthesizer_model = self
            .synthesizer_model
            .ok_or_else(|| GraphError::config("synthesizer model is required"))?;

        let mut classifier = ClassifierNode::new(classifier_model);
        if let Some(config) = self.classifier_config {
            classifier = classifier.with_config(config);
        }
        let mut synthesizer = SynthesizerNode::new(synthesizer_model);
        if let Some(config) = self.synthesizer_config {
            synthesizer = synthesizer.with_config(config);
        }

        let mut builder = GraphBuilder::new("attendant")
            .with_state_schema(attendant_schema())
            .with_config(self.graph_config)
            .add_node(CLASSIFY, Arc::new(classifier));

        for id in HandlerId::ALL {
            let agent = self.handlers.remove(&id).ok_or_else(|| {
                GraphError::config(format!("no agent registered for handler '{}'", id))
            })?;
            builder = builder
                .add_node(id.as_str(), Arc::new(HandlerNode::new(id, agent)))
                .add_edge(id.as_str(), SYNTHESIZE);
        }

        let graph = builder
            .add_node(SYNTHESIZE, Arc::new(synthesizer))
            .add_edge(START, CLASSIFY)
            .add_conditional_edges(
                CLASSIFY,
                route_to_handlers,
                HandlerId::ALL.iter().map(HandlerId::as_str),
            )
            // No payload: the fallback handler reads the caller's query from state
            .with_fallback(CLASSIFY, Dispatch::to(FALLBACK_HANDLER.as_str()))
            .add_edge(SYNTHESIZE, END)
            .compile()?;

        log::info!("Attendant workflow ready with nodes {:?}", graph.node_ids());
        Ok(AttendantWorkflow { graph })
    }
}
