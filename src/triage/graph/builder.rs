// SPDX-License-Identifier: MIT

//! Graph builder - registers nodes and edges and validates them into a `CompiledGraph`

use super::executor::CompiledGraph;
use super::node::{FnNode, Node, NodeInput};
use super::router::{ConditionalEdge, Router};
use super::types::{Dispatch, GraphConfig, NodeId, END, START};
use crate::adk::error::{GraphError, NodeError};
use crate::triage::state::{StateSchema, StateUpdate};

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

/// Collects node and edge registrations. Nothing is validated until [`GraphBuilder::compile`].
pub struct GraphBuilder {
    name: String,
    schema: StateSchema,
    config: GraphConfig,
    nodes: Vec<(NodeId, Arc<dyn Node>)>,
    edges: Vec<(NodeId, NodeId)>,
    conditional: Vec<(NodeId, ConditionalEdge)>,
    fallbacks: Vec<(NodeId, Dispatch)>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: StateSchema::default(),
            config: GraphConfig::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            conditional: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Set the state schema; reducers are fixed from here on
    pub fn with_state_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a node. Registration order is the declared order used to break merge ties.
    pub fn add_node(mut self, id: impl Into<NodeId>, node: Arc<dyn Node>) -> Self {
        self.nodes.push((id.into(), node));
        self
    }

    /// Register an async closure as a node
    pub fn add_fn_node<F, Fut>(self, id: impl Into<NodeId>, f: F) -> Self
    where
        F: Fn(NodeInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StateUpdate, NodeError>> + Send + 'static,
    {
        self.add_node(id, Arc::new(FnNode::new(f)))
    }

    /// Add a static edge. `from` may be [`START`], `to` may be [`END`].
    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Add a conditional edge whose router may only target `possible_targets`
    pub fn add_conditional_edges<R, I, S>(
        mut self,
        from: impl Into<NodeId>,
        router: R,
        possible_targets: I,
    ) -> Self
    where
        R: Router + 'static,
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let targets = possible_targets.into_iter().map(Into::into).collect();
        self.conditional
            .push((from.into(), ConditionalEdge::new(Arc::new(router), targets)));
        self
    }

    /// Declare the dispatch used when the router on `from` returns nothing
    pub fn with_fallback(mut self, from: impl Into<NodeId>, fallback: Dispatch) -> Self {
        self.fallbacks.push((from.into(), fallback));
        self
    }

    /// Validate the registrations and produce an immutable graph
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        let mut order: HashMap<NodeId, usize> = HashMap::new();
        for (index, (id, _)) in self.nodes.iter().enumerate() {
            if id == START || id == END {
                return Err(GraphError::config(format!(
                    "Node id '{}' is reserved",
                    id
                )));
            }
            if order.insert(id.clone(), index).is_some() {
                return Err(GraphError::config(format!("Duplicate node id '{}'", id)));
            }
        }

        let is_source = |id: &str| id == START || order.contains_key(id);
        let is_target = |id: &str| id == END || order.contains_key(id);

        let mut static_edges: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (from, to) in &self.edges {
            if !is_source(from) {
                return Err(GraphError::config(format!(
                    "Edge source '{}' is not a registered node",
                    from
                )));
            }
            if !is_target(to) {
                return Err(GraphError::config(format!(
                    "Edge target '{}' is not a registered node",
                    to
                )));
            }
            let targets = static_edges.entry(from.clone()).or_default();
            if !targets.contains(to) {
                targets.push(to.clone());
            }
        }

        let mut conditional: HashMap<NodeId, ConditionalEdge> = HashMap::new();
        for (from, edge) in self.conditional {
            if !is_source(&from) {
                return Err(GraphError::config(format!(
                    "Conditional edge source '{}' is not a registered node",
                    from
                )));
            }
            if edge.possible_targets.is_empty() {
                return Err(GraphError::config(format!(
                    "Conditional edge from '{}' declares no possible targets",
                    from
                )));
            }
            if let Some(missing) = edge.possible_targets.iter().find(|t| !is_target(t)) {
                return Err(GraphError::config(format!(
                    "Conditional edge from '{}' targets unregistered node '{}'",
                    from, missing
                )));
            }
            if conditional.insert(from.clone(), edge).is_some() {
                return Err(GraphError::config(format!(
                    "Node '{}' declares more than one conditional edge",
                    from
                )));
            }
        }

        for (from, fallback) in self.fallbacks {
            let edge = conditional.get_mut(&from).ok_or_else(|| {
                GraphError::config(format!(
                    "Fallback declared on '{}' which has no conditional edge",
                    from
                ))
            })?;
            if !is_target(&fallback.target) {
                return Err(GraphError::config(format!(
                    "Fallback target '{}' is not a registered node",
                    fallback.target
                )));
            }
            if !edge.possible_targets.contains(&fallback.target) {
                return Err(GraphError::config(format!(
                    "Fallback target '{}' is not among the possible targets of '{}'",
                    fallback.target, from
                )));
            }
            edge.fallback = Some(fallback);
        }

        let start_sets = usize::from(static_edges.contains_key(START))
            + usize::from(conditional.contains_key(START));
        if start_sets != 1 {
            return Err(GraphError::config(format!(
                "Graph must have exactly one start successor set, found {}",
                start_sets
            )));
        }

        let reaches_end = static_edges.values().flatten().any(|t| t == END)
            || conditional
                .values()
                .any(|e| e.possible_targets.iter().any(|t| t == END));
        if !reaches_end {
            return Err(GraphError::config("No edge leads to END"));
        }

        for (id, _) in &self.nodes {
            if !static_edges.contains_key(id) && !conditional.contains_key(id) {
                return Err(GraphError::config(format!(
                    "Node '{}' has no outgoing edge",
                    id
                )));
            }
        }

        warn_unreachable(&self.name, &self.nodes, &static_edges, &conditional);

        log::info!(
            "Compiled graph '{}' with {} nodes",
            self.name,
            self.nodes.len()
        );

        Ok(CompiledGraph::new(
            self.name,
            self.nodes,
            static_edges,
            conditional,
            self.schema,
            self.config,
        ))
    }
}

fn warn_unreachable(
    name: &str,
    nodes: &[(NodeId, Arc<dyn Node>)],
    static_edges: &HashMap<NodeId, Vec<NodeId>>,
    conditional: &HashMap<NodeId, ConditionalEdge>,
) {
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut stack = vec![START];

    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        let statics = static_edges.get(id).into_iter().flatten();
        let routed = conditional
            .get(id)
            .into_iter()
            .flat_map(|e| e.possible_targets.iter());
        stack.extend(statics.chain(routed).map(String::as_str));
    }

    for (id, _) in nodes {
        if !reachable.contains(id.as_str()) {
            log::warn!("Node '{}' in graph '{}' is unreachable from START", id, name);
        }
    }
}
