// SPDX-License-Identifier: MIT

//! Graph type definitions shared by the builder, routers and executor

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node identifier
pub type NodeId = String;

/// Entry marker: edges from `START` define the first pulse
pub const START: &str = "__start__";

/// Terminal marker: a run finishes once `END` is the only frontier member
pub const END: &str = "__end__";

/// One activation of a node in the next pulse.
///
/// `input` is set when the dispatch came from a conditional router; nodes reached
/// through static edges receive a snapshot of the state instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl Dispatch {
    /// Dispatch to `target` with the current state as input
    pub fn to(target: impl Into<NodeId>) -> Self {
        Self {
            target: target.into(),
            input: None,
        }
    }

    /// Dispatch to `target` with a dedicated input
    pub fn with_input(target: impl Into<NodeId>, input: Value) -> Self {
        Self {
            target: target.into(),
            input: Some(input),
        }
    }
}

/// Runtime limits for a compiled graph
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphConfig {
    /// Maximum number of pulses per run
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
}

fn default_recursion_limit() -> usize {
    25
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_constructors() {
        assert_eq!(Dispatch::to("blog").input, None);
        let d = Dispatch::with_input("appointments", json!({"query": "Book for Ana"}));
        assert_eq!(d.target, "appointments");
        assert_eq!(d.input.unwrap()["query"], "Book for Ana");
    }

    #[test]
    fn test_graph_config_default() {
        let config: GraphConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, GraphConfig::default());
        assert_eq!(config.recursion_limit, 25);
    }

    #[test]
    fn test_markers_are_distinct() {
        assert_ne!(START, END);
    }
}
