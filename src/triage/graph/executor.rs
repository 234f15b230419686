// SPDX-License-Identifier: MIT

//! Graph workflow executor
//!
//! Runs a compiled graph in pulses: every active node of a pulse is launched on a
//! `JoinSet`, the pulse settles when all of them finish, their updates are merged in
//! declared node order and the outgoing edges of the nodes just run decide the next
//! frontier.

use super::node::{Node, NodeInput};
use super::router::ConditionalEdge;
use super::types::{Dispatch, GraphConfig, NodeId, END, START};
use crate::adk::error::{GraphError, NodeError};
use crate::triage::state::{StateSchema, StateUpdate, WorkflowState};

use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// An immutable, validated graph. Safe to share across concurrent runs.
pub struct CompiledGraph {
    name: String,
    nodes: HashMap<NodeId, Arc<dyn Node>>,
    /// Declared order, used to break merge ties deterministically
    order: HashMap<NodeId, usize>,
    node_order: Vec<NodeId>,
    edges: HashMap<NodeId, Vec<NodeId>>,
    conditional: HashMap<NodeId, ConditionalEdge>,
    schema: Arc<StateSchema>,
    config: GraphConfig,
}

type Settled = (usize, NodeId, Result<StateUpdate, NodeError>);

impl CompiledGraph {
    pub(super) fn new(
        name: String,
        nodes: Vec<(NodeId, Arc<dyn Node>)>,
        edges: HashMap<NodeId, Vec<NodeId>>,
        conditional: HashMap<NodeId, ConditionalEdge>,
        schema: StateSchema,
        config: GraphConfig,
    ) -> Self {
        let node_order: Vec<NodeId> = nodes.iter().map(|(id, _)| id.clone()).collect();
        let order = node_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Self {
            name,
            nodes: nodes.into_iter().collect(),
            order,
            node_order,
            edges,
            conditional,
            schema: Arc::new(schema),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node ids in declared order
    pub fn node_ids(&self) -> Vec<&str> {
        self.node_order.iter().map(|s| s.as_str()).collect()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Run the graph to completion from `seed`
    pub async fn invoke(&self, seed: StateUpdate) -> Result<WorkflowState, GraphError> {
        self.invoke_with_cancel(seed, CancellationToken::new()).await
    }

    /// Run the graph, stopping before the next pulse once `cancel` fires.
    ///
    /// Nodes already in flight are detached and left to finish; their results are
    /// discarded.
    pub async fn invoke_with_cancel(
        &self,
        seed: StateUpdate,
        cancel: CancellationToken,
    ) -> Result<WorkflowState, GraphError> {
        let run_id = Uuid::new_v4();
        log::info!("Graph '{}' run {} started", self.name, run_id);

        let mut state = WorkflowState::new(self.schema.clone());
        state.seed(seed);

        let mut frontier = self.successors(START, &state)?;
        let mut pulse = 0;

        loop {
            let (runnable, ended): (Vec<Dispatch>, Vec<Dispatch>) =
                frontier.into_iter().partition(|d| d.target != END);

            if runnable.is_empty() {
                log::info!(
                    "Graph '{}' run {} finished after {} pulses",
                    self.name,
                    run_id,
                    pulse
                );
                return Ok(state);
            }
            if !ended.is_empty() {
                log::debug!("A branch reached END while {} nodes remain", runnable.len());
            }

            if cancel.is_cancelled() {
                log::warn!("Graph '{}' run {} cancelled", self.name, run_id);
                return Err(GraphError::Cancelled);
            }

            pulse += 1;
            if pulse > self.config.recursion_limit {
                log::error!(
                    "Graph '{}' run {} exceeded {} pulses",
                    self.name,
                    run_id,
                    self.config.recursion_limit
                );
                return Err(GraphError::RecursionLimit(self.config.recursion_limit));
            }

            log::info!(
                "Graph '{}' pulse {}: executing {} nodes: {:?}",
                self.name,
                pulse,
                runnable.len(),
                runnable.iter().map(|d| d.target.as_str()).collect::<Vec<_>>()
            );

            let updates = self.run_pulse(runnable, &state, &cancel).await?;
            let ran: Vec<NodeId> = updates.iter().map(|(id, _)| id.clone()).collect();
            state.merge_pulse(updates);

            frontier = self.next_frontier(&ran, &state)?;
        }
    }

    /// Launch every dispatch concurrently and wait for all of them to settle.
    ///
    /// Returns the updates sorted by declared node order. If any node failed, the
    /// first failure in declared order is returned and nothing is merged.
    async fn run_pulse(
        &self,
        dispatches: Vec<Dispatch>,
        state: &WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<Vec<(NodeId, StateUpdate)>, GraphError> {
        let mut join_set: JoinSet<Settled> = JoinSet::new();
        let expected = dispatches.len();

        for dispatch in dispatches {
            let node = self.nodes.get(&dispatch.target).cloned().ok_or_else(|| {
                GraphError::routing(
                    dispatch.target.clone(),
                    "dispatch to a node that is not registered",
                )
            })?;
            let index = self.order[&dispatch.target];
            let input = NodeInput::new(state.clone(), dispatch.input);
            let node_id = dispatch.target;

            join_set.spawn(async move {
                log::debug!("Executing node: {}", node_id);
                let result = match AssertUnwindSafe(node.run(input)).catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => Err(NodeError::Task("node panicked".to_string())),
                };
                (index, node_id, result)
            });
        }

        let mut settled: Vec<Settled> = Vec::with_capacity(expected);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::warn!(
                        "Cancelled with {} nodes still in flight; their results will be discarded",
                        expected - settled.len()
                    );
                    join_set.detach_all();
                    return Err(GraphError::Cancelled);
                }
                joined = join_set.join_next() => match joined {
                    Some(Ok(entry)) => settled.push(entry),
                    Some(Err(e)) => {
                        return Err(GraphError::node(
                            self.name.clone(),
                            NodeError::Task(e.to_string()),
                        ))
                    }
                    None => break,
                },
            }
        }

        settled.sort_by_key(|(index, _, _)| *index);

        let mut updates = Vec::with_capacity(settled.len());
        for (_, node_id, result) in settled {
            match result {
                Ok(update) => {
                    log::info!("Node {} completed", node_id);
                    updates.push((node_id, update));
                }
                Err(e) => {
                    log::error!("Node {} failed: {}", node_id, e);
                    return Err(GraphError::node(node_id, e));
                }
            }
        }

        Ok(updates)
    }

    /// Resolve the outgoing edges of `ran` (in declared order) against the merged state
    fn next_frontier(
        &self,
        ran: &[NodeId],
        state: &WorkflowState,
    ) -> Result<Vec<Dispatch>, GraphError> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut frontier = Vec::new();

        for node_id in ran {
            for dispatch in self.successors(node_id, state)? {
                if seen.insert(dispatch.target.clone()) {
                    frontier.push(dispatch);
                } else if dispatch.target != END {
                    log::warn!(
                        "Node '{}' dispatched more than once in the next pulse; keeping the first",
                        dispatch.target
                    );
                }
            }
        }

        Ok(frontier)
    }

    fn successors(&self, from: &str, state: &WorkflowState) -> Result<Vec<Dispatch>, GraphError> {
        let mut next: Vec<Dispatch> = self
            .edges
            .get(from)
            .map(|targets| targets.iter().map(Dispatch::to).collect())
            .unwrap_or_default();

        if let Some(edge) = self.conditional.get(from) {
            next.extend(edge.resolve(from, state)?);
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::graph::builder::GraphBuilder;
    use crate::triage::graph::node::into_update;
    use crate::triage::state::{FieldType, ReducerType};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn schema() -> StateSchema {
        StateSchema::new()
            .field("query", FieldType::String, ReducerType::Overwrite)
            .field_with_default("results", FieldType::Array, ReducerType::Append, json!([]))
            .field("answer", FieldType::String, ReducerType::Overwrite)
    }

    fn seed(query: &str) -> StateUpdate {
        into_update(json!({ "query": query })).unwrap()
    }

    fn results(state: &WorkflowState) -> Vec<Value> {
        state.get("results").unwrap().as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn test_sequential_execution() {
        let graph = GraphBuilder::new("seq")
            .with_state_schema(schema())
            .add_fn_node("a", |_| async { into_update(json!({"results": ["a"]})) })
            .add_fn_node("b", |input: NodeInput| async move {
                let seen = input.state.get("results").cloned().unwrap_or_default();
                into_update(json!({"answer": format!("b saw {}", seen)}))
            })
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .compile()
            .unwrap();

        let state = graph.invoke(seed("hi")).await.unwrap();

        assert_eq!(state.get_str("answer"), Some("b saw [\"a\"]"));
        assert_eq!(state.get_str("query"), Some("hi"));
    }

    #[tokio::test]
    async fn test_parallel_merge_follows_declared_order() {
        // "slow" is declared first but finishes last
        let graph = GraphBuilder::new("par")
            .with_state_schema(schema())
            .add_fn_node("slow", |_| async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                into_update(json!({"results": ["slow"], "answer": "slow"}))
            })
            .add_fn_node("fast", |_| async {
                into_update(json!({"results": ["fast"], "answer": "fast"}))
            })
            .add_edge(START, "slow")
            .add_edge(START, "fast")
            .add_edge("slow", END)
            .add_edge("fast", END)
            .compile()
            .unwrap();

        let state = graph.invoke(seed("q")).await.unwrap();

        assert_eq!(results(&state), vec![json!("slow"), json!("fast")]);
        assert_eq!(state.get_str("answer"), Some("fast"));
    }

    #[tokio::test]
    async fn test_routed_input_reaches_node() {
        let graph = GraphBuilder::new("routed")
            .with_state_schema(schema())
            .add_fn_node("classify", |_| async { into_update(json!({})) })
            .add_fn_node("handler", |input: NodeInput| async move {
                let payload = input.payload.clone().unwrap_or(Value::Null);
                into_update(json!({"results": [payload["query"].clone()]}))
            })
            .add_edge(START, "classify")
            .add_conditional_edges(
                "classify",
                |_: &WorkflowState| vec![Dispatch::with_input("handler", json!({"query": "sub"}))],
                ["handler"],
            )
            .add_edge("handler", END)
            .compile()
            .unwrap();

        let state = graph.invoke(seed("original")).await.unwrap();
        assert_eq!(results(&state), vec![json!("sub")]);
    }

    #[tokio::test]
    async fn test_node_failure_is_surfaced_with_id() {
        let graph = GraphBuilder::new("fail")
            .with_state_schema(schema())
            .add_fn_node("ok", |_| async { into_update(json!({"results": ["ok"]})) })
            .add_fn_node("broken", |_| async { Err(NodeError::failed("model offline")) })
            .add_fn_node("after", |_| async { into_update(json!({"answer": "never"})) })
            .add_edge(START, "ok")
            .add_edge(START, "broken")
            .add_edge("ok", "after")
            .add_edge("broken", "after")
            .add_edge("after", END)
            .compile()
            .unwrap();

        let err = graph.invoke(seed("q")).await.unwrap_err();
        match err {
            GraphError::Node { node, source } => {
                assert_eq!(node, "broken");
                assert_eq!(source.to_string(), "model offline");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_node_becomes_node_error() {
        let graph = GraphBuilder::new("panic")
            .add_fn_node("explode", |_| async {
                if true {
                    panic!("boom");
                }
                into_update(json!({}))
            })
            .add_edge(START, "explode")
            .add_edge("explode", END)
            .compile()
            .unwrap();

        let err = graph.invoke(StateUpdate::new()).await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::Node {
                source: NodeError::Task(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let graph = GraphBuilder::new("loop")
            .with_config(GraphConfig { recursion_limit: 3 })
            .add_fn_node("a", |_| async { into_update(json!({})) })
            .add_edge(START, "a")
            .add_conditional_edges("a", |_: &WorkflowState| vec![Dispatch::to("a")], ["a", END])
            .compile()
            .unwrap();

        let err = graph.invoke(StateUpdate::new()).await.unwrap_err();
        assert!(matches!(err, GraphError::RecursionLimit(3)));
    }

    #[tokio::test]
    async fn test_cancel_before_first_pulse() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let graph = GraphBuilder::new("cancel")
            .add_fn_node("a", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    into_update(json!({}))
                }
            })
            .add_edge(START, "a")
            .add_edge("a", END)
            .compile()
            .unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let err = graph
            .invoke_with_cancel(StateUpdate::new(), token)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_results() {
        let graph = GraphBuilder::new("cancel")
            .with_state_schema(schema())
            .add_fn_node("slow", |_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                into_update(json!({"results": ["late"]}))
            })
            .add_edge(START, "slow")
            .add_edge("slow", END)
            .compile()
            .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = graph
            .invoke_with_cancel(StateUpdate::new(), token)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Cancelled));
    }

    #[tokio::test]
    async fn test_duplicate_dispatch_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let graph = GraphBuilder::new("dedupe")
            .with_state_schema(schema())
            .add_fn_node("a", |_| async { into_update(json!({})) })
            .add_fn_node("b", |_| async { into_update(json!({})) })
            .add_fn_node("join", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    into_update(json!({"results": ["joined"]}))
                }
            })
            .add_edge(START, "a")
            .add_edge(START, "b")
            .add_edge("a", "join")
            .add_edge("b", "join")
            .add_edge("join", END)
            .compile()
            .unwrap();

        let state = graph.invoke(StateUpdate::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results(&state), vec![json!("joined")]);
    }

    #[tokio::test]
    async fn test_graph_is_shared_across_concurrent_runs() {
        let graph = Arc::new(
            GraphBuilder::new("shared")
                .with_state_schema(schema())
                .add_fn_node("echo", |input: NodeInput| async move {
                    let query = input.state.get_str("query").unwrap_or_default().to_string();
                    into_update(json!({"results": [query]}))
                })
                .add_edge(START, "echo")
                .add_edge("echo", END)
                .compile()
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let graph = graph.clone();
            handles.push(tokio::spawn(async move {
                graph.invoke(seed(&format!("q{}", i))).await.unwrap()
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let state = handle.await.unwrap();
            assert_eq!(results(&state), vec![json!(format!("q{}", i))]);
        }
    }
}
