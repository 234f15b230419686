// SPDX-License-Identifier: MIT

//! Specialized handler nodes and the agents behind them

use super::classification::HandlerId;
use crate::adk::agent::{Agent, LLMAgent};
use crate::adk::error::NodeError;
use crate::adk::model::{GenerationConfig, Model};
use crate::adk::tool::Tool;
use crate::triage::graph::{Node, NodeInput};
use crate::triage::state::StateUpdate;
use crate::triage::tools::{appointments, DocumentStore, RetrieveTool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BLOG_QUESTION_LIMIT: usize = 100;

const APPOINTMENTS_INSTRUCTION: &str = r#"Role:
You're an appointment manager.
You MUST search, book or cancel patients appointments using the available tools.

Task:
Analyze the user's query and answer the request using the results from the tools.

Constraints:
- Respond only with appointment related content.
- When an appointment is found or created, respond with its details.
- Extract the patient's name from the query.
- If book_appointments returns a valid record, the appointment is created; say so."#;

const MEDICAL_QA_INSTRUCTION: &str = r#"You're a medical assistant helping a general practitioner during screening.
Answer the question clearly and avoid duplicated explanations.
Do not give a definitive diagnosis."#;

const BLOG_INSTRUCTION: &str = r#"Role:
You're a media analyst assistant that summarizes blog posts about healthcare.

Knowledge:
You have access to a tool that retrieves context from blog posts. Use it to answer user queries.

Task:
- Given a user question, use the retrieve tool to get relevant context.
- Summarize the context to answer the user's question concisely.

Constraints:
- You MUST use the tool to retrieve context before answering.
- End the answer with the sources you used, e.g.
  References:
    - Source: posts/ai-referrals.md"#;

/// Output of one handler invocation, appended to the `results` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub source: HandlerId,
    pub result: String,
}

#[derive(Debug, Deserialize)]
struct HandlerInput {
    query: String,
    #[serde(rename = "originalQuery", default)]
    original_query: Option<String>,
}

/// Shorten a question to the blog agent's limit and upper-case it
pub fn format_blog_question(question: &str) -> String {
    let formatted = if question.chars().count() > BLOG_QUESTION_LIMIT {
        let head: String = question.chars().take(BLOG_QUESTION_LIMIT).collect();
        format!("{}...", head)
    } else {
        question.to_string()
    };
    formatted.to_uppercase()
}

/// Runs one specialized agent and reports its answer under the handler's source tag.
///
/// Agent failures never escape the node: they become a placeholder result so
/// sibling handlers in the same pulse are unaffected.
pub struct HandlerNode {
    handler: HandlerId,
    agent: Arc<dyn Agent>,
}

impl HandlerNode {
    pub fn new(handler: HandlerId, agent: Arc<dyn Agent>) -> Self {
        Self { handler, agent }
    }

    fn prepare(&self, query: &str) -> String {
        match self.handler {
            HandlerId::Blog => format_blog_question(query),
            _ => query.to_string(),
        }
    }

    fn placeholder(&self) -> String {
        format!(
            "The {} service could not process this request right now.",
            self.handler
        )
    }
}

#[async_trait]
impl Node for HandlerNode {
    async fn run(&self, input: NodeInput) -> Result<StateUpdate, NodeError> {
        let HandlerInput {
            query,
            original_query,
        } = input.parse()?;

        log::info!(
            "Handler {} processing '{}' (original: {})",
            self.handler,
            query,
            original_query.as_deref().unwrap_or("-")
        );

        let result = match self.agent.run(self.prepare(&query)).await {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Handler {} agent failed: {}", self.handler, e);
                self.placeholder()
            }
        };

        let results = vec![HandlerResult {
            source: self.handler,
            result,
        }];
        let mut update = StateUpdate::new();
        update.insert("results".to_string(), serde_json::to_value(results)?);
        Ok(update)
    }
}

/// Agent managing appointments through the appointment tools
pub fn appointments_agent(model: Arc<dyn Model>, config: Option<GenerationConfig>) -> LLMAgent {
    build_agent(
        HandlerId::Appointments,
        "Searches and books patient appointments",
        APPOINTMENTS_INSTRUCTION,
        model,
        appointments::create_tools(),
        config,
    )
}

/// Agent answering clinical questions, no tools
pub fn medical_qa_agent(model: Arc<dyn Model>, config: Option<GenerationConfig>) -> LLMAgent {
    build_agent(
        HandlerId::MedicalQa,
        "Answers medical questions for screening",
        MEDICAL_QA_INSTRUCTION,
        model,
        Vec::new(),
        config,
    )
}

/// Agent summarizing blog content found through the retrieve tool
pub fn blog_agent(
    model: Arc<dyn Model>,
    store: Arc<dyn DocumentStore>,
    config: Option<GenerationConfig>,
) -> LLMAgent {
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(RetrieveTool::new(store))];
    build_agent(
        HandlerId::Blog,
        "Summarizes healthcare blog posts",
        BLOG_INSTRUCTION,
        model,
        tools,
        config,
    )
}

fn build_agent(
    handler: HandlerId,
    description: &str,
    instruction: &str,
    model: Arc<dyn Model>,
    tools: Vec<Arc<dyn Tool>>,
    config: Option<GenerationConfig>,
) -> LLMAgent {
    let agent = LLMAgent::new(
        handler.to_string(),
        description.to_string(),
        instruction.to_string(),
        model,
        tools,
    );
    match config {
        Some(config) => agent.with_config(config),
        None => agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::BoxError;
    use crate::triage::state::WorkflowState;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingAgent {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingAgent {
        fn new(fail: bool) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Agent for RecordingAgent {
        fn name(&self) -> &str {
            "recording"
        }

        async fn run(&self, input: String) -> Result<String, BoxError> {
            self.seen.lock().unwrap().push(input.clone());
            if self.fail {
                Err("model offline".into())
            } else {
                Ok(format!("answer to {}", input))
            }
        }
    }

    fn routed(query: &str) -> NodeInput {
        NodeInput::new(
            WorkflowState::empty(),
            Some(json!({"query": query, "originalQuery": "full question"})),
        )
    }

    #[test]
    fn test_format_blog_question() {
        assert_eq!(format_blog_question("ai in care"), "AI IN CARE");

        let long = "a".repeat(150);
        let formatted = format_blog_question(&long);
        assert_eq!(formatted.len(), 103);
        assert!(formatted.ends_with("..."));
    }

    #[tokio::test]
    async fn test_handler_wraps_answer_in_results() {
        let agent = Arc::new(RecordingAgent::new(false));
        let node = HandlerNode::new(HandlerId::Appointments, agent.clone());

        let update = node.run(routed("Book for Ana")).await.unwrap();
        assert_eq!(
            update["results"],
            json!([{"source": "appointments", "result": "answer to Book for Ana"}])
        );
        assert_eq!(*agent.seen.lock().unwrap(), vec!["Book for Ana".to_string()]);
    }

    #[tokio::test]
    async fn test_blog_handler_formats_question() {
        let agent = Arc::new(RecordingAgent::new(false));
        let node = HandlerNode::new(HandlerId::Blog, agent.clone());

        node.run(routed("ai trends")).await.unwrap();
        assert_eq!(*agent.seen.lock().unwrap(), vec!["AI TRENDS".to_string()]);
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_placeholder() {
        let node = HandlerNode::new(HandlerId::MedicalQa, Arc::new(RecordingAgent::new(true)));

        let update = node.run(routed("fever")).await.unwrap();
        let results: Vec<HandlerResult> = serde_json::from_value(update["results"].clone()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, HandlerId::MedicalQa);
        assert!(results[0].result.contains("medical-qa"));
    }

    #[tokio::test]
    async fn test_unrouted_handler_reads_state_query() {
        let agent = Arc::new(RecordingAgent::new(false));
        let node = HandlerNode::new(HandlerId::Blog, agent.clone());
        let mut state = WorkflowState::empty();
        state.update("query", json!("telemedicine"));

        node.run(NodeInput::new(state, None)).await.unwrap();
        assert_eq!(*agent.seen.lock().unwrap(), vec!["TELEMEDICINE".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid_input() {
        let node = HandlerNode::new(HandlerId::Blog, Arc::new(RecordingAgent::new(false)));
        let err = node
            .run(NodeInput::new(WorkflowState::empty(), Some(json!({}))))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput(_)));
    }

    #[test]
    fn test_agent_constructors() {
        struct NoModel;
        #[async_trait]
        impl Model for NoModel {
            async fn generate_content(
                &self,
                _history: &[crate::adk::model::Content],
                _config: Option<&GenerationConfig>,
                _tools: Option<&[Arc<dyn Tool>]>,
            ) -> Result<crate::adk::model::Content, BoxError> {
                Err("unused".into())
            }
        }

        let store = Arc::new(crate::triage::tools::InMemoryDocumentStore::default());
        assert_eq!(appointments_agent(Arc::new(NoModel), None).tools.len(), 2);
        assert!(medical_qa_agent(Arc::new(NoModel), None).tools.is_empty());
        assert_eq!(blog_agent(Arc::new(NoModel), store, None).name(), "blog");
    }
}
