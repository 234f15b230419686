// SPDX-License-Identifier: MIT

//! Conditional routing (dynamic fan-out)

use super::types::{Dispatch, NodeId};
use crate::adk::error::GraphError;
use crate::triage::state::WorkflowState;
use std::sync::Arc;

/// Decides from the merged state which nodes run next and with what input
pub trait Router: Send + Sync {
    fn route(&self, state: &WorkflowState) -> Vec<Dispatch>;
}

impl<F> Router for F
where
    F: Fn(&WorkflowState) -> Vec<Dispatch> + Send + Sync,
{
    fn route(&self, state: &WorkflowState) -> Vec<Dispatch> {
        self(state)
    }
}

/// A conditional edge: a router, its declared targets and an optional fallback
#[derive(Clone)]
pub struct ConditionalEdge {
    pub router: Arc<dyn Router>,
    pub possible_targets: Vec<NodeId>,
    pub fallback: Option<Dispatch>,
}

impl ConditionalEdge {
    pub fn new(router: Arc<dyn Router>, possible_targets: Vec<NodeId>) -> Self {
        Self {
            router,
            possible_targets,
            fallback: None,
        }
    }

    /// Run the router for `from` and validate what it returned.
    ///
    /// One dispatch and many dispatches take the same path; an empty result is
    /// replaced by the fallback.
    pub fn resolve(
        &self,
        from: &str,
        state: &WorkflowState,
    ) -> Result<Vec<Dispatch>, GraphError> {
        let mut dispatches = self.router.route(state);

        if dispatches.is_empty() {
            match &self.fallback {
                Some(fallback) => {
                    log::warn!(
                        "Router on '{}' returned no targets, taking fallback '{}'",
                        from,
                        fallback.target
                    );
                    dispatches.push(fallback.clone());
                }
                None => {
                    return Err(GraphError::routing(
                        from,
                        "router returned no targets and no fallback is declared",
                    ))
                }
            }
        }

        for dispatch in &dispatches {
            if !self.possible_targets.contains(&dispatch.target) {
                return Err(GraphError::routing(
                    from,
                    format!(
                        "target '{}' is not among the declared targets {:?}",
                        dispatch.target, self.possible_targets
                    ),
                ));
            }
        }

        log::debug!(
            "Router on '{}' dispatched to {:?}",
            from,
            dispatches.iter().map(|d| d.target.as_str()).collect::<Vec<_>>()
        );

        Ok(dispatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn targets() -> Vec<NodeId> {
        vec!["appointments".to_string(), "blog".to_string()]
    }

    #[test]
    fn test_resolve_single_target() {
        let edge = ConditionalEdge::new(
            Arc::new(|_: &WorkflowState| vec![Dispatch::to("appointments")]),
            targets(),
        );
        let dispatches = edge.resolve("classify", &WorkflowState::empty()).unwrap();
        assert_eq!(dispatches, vec![Dispatch::to("appointments")]);
    }

    #[test]
    fn test_resolve_multiple_targets_keeps_inputs() {
        let edge = ConditionalEdge::new(
            Arc::new(|_: &WorkflowState| {
                vec![
                    Dispatch::with_input("appointments", json!({"query": "a"})),
                    Dispatch::with_input("blog", json!({"query": "b"})),
                ]
            }),
            targets(),
        );
        let dispatches = edge.resolve("classify", &WorkflowState::empty()).unwrap();
        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[1].input, Some(json!({"query": "b"})));
    }

    #[test]
    fn test_resolve_empty_takes_fallback() {
        let mut edge = ConditionalEdge::new(Arc::new(|_: &WorkflowState| vec![]), targets());
        edge.fallback = Some(Dispatch::to("blog"));

        let dispatches = edge.resolve("classify", &WorkflowState::empty()).unwrap();
        assert_eq!(dispatches, vec![Dispatch::to("blog")]);
    }

    #[test]
    fn test_resolve_empty_without_fallback_fails() {
        let edge = ConditionalEdge::new(Arc::new(|_: &WorkflowState| vec![]), targets());
        let err = edge.resolve("classify", &WorkflowState::empty()).unwrap_err();
        assert!(matches!(err, GraphError::Routing { .. }));
    }

    #[test]
    fn test_resolve_undeclared_target_fails() {
        let edge = ConditionalEdge::new(
            Arc::new(|_: &WorkflowState| vec![Dispatch::to("billing")]),
            targets(),
        );
        let err = edge.resolve("classify", &WorkflowState::empty()).unwrap_err();
        assert!(err.to_string().contains("billing"));
    }
}
