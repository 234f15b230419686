// SPDX-License-Identifier: MIT

//! Typed error handling for triage-graph
//!
//! Only `Configuration` and `Routing` errors are expected to reach the caller of a
//! well-behaved workflow: both point at a wiring defect in the graph. Model and
//! handler outages are recovered inside the nodes themselves.

use thiserror::Error;

/// Boxed error returned by external collaborators (models, agents, tools)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building or running a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Malformed graph detected at build time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A conditional router produced an undeclared target or nothing at all
    #[error("Routing error from '{from}': {message}")]
    Routing { from: String, message: String },

    /// A node failed hard; the pulse containing it was not merged
    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },

    /// The caller cancelled the run
    #[error("Run cancelled")]
    Cancelled,

    /// The run exceeded the configured number of pulses
    #[error("Recursion limit of {0} pulses reached")]
    RecursionLimit(usize),
}

impl GraphError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a routing error
    pub fn routing(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Routing {
            from: from.into(),
            message: message.into(),
        }
    }

    /// Wrap a node failure with the id of the node that produced it
    pub fn node(node: impl Into<String>, source: NodeError) -> Self {
        Self::Node {
            node: node.into(),
            source,
        }
    }
}

/// Errors returned by a single node invocation
#[derive(Debug, Error)]
pub enum NodeError {
    /// Node input could not be deserialized into the shape the node expects
    #[error("Invalid node input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    /// Node returned something that is not a partial state object
    #[error("Invalid node output: {0}")]
    InvalidOutput(String),

    /// An external collaborator failed and the node chose not to recover
    #[error("Collaborator error: {0}")]
    Collaborator(BoxError),

    /// The node task panicked or was aborted
    #[error("Node task failed: {0}")]
    Task(String),

    /// Generic failure
    #[error("{0}")]
    Failed(String),
}

impl NodeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<BoxError> for NodeError {
    fn from(err: BoxError) -> Self {
        Self::Collaborator(err)
    }
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider name not recognised
    #[error("Unknown model provider: {0}")]
    UnknownProvider(String),

    /// Non-success status returned by the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while loading application configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
