// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the graph builder, the node and router contracts, and the
//! pulse executor that runs nodes concurrently and merges their updates.

mod builder;
pub mod executor;
pub mod node;
pub mod router;
pub mod types;

pub use builder::GraphBuilder;
pub use executor::CompiledGraph;
pub use node::{into_update, FnNode, Node, NodeInput};
pub use router::{ConditionalEdge, Router};
pub use types::{Dispatch, GraphConfig, NodeId, END, START};
