// SPDX-License-Identifier: MIT

//! Attendant workflow built on the graph engine
//!
//! - [classification] - handler ids, classification shapes and keyword rules
//! - [classifier] - model-backed classifier node
//! - [handlers] - specialized handler nodes and their agents
//! - [synthesizer] - final answer node
//! - [attendant] - graph wiring and the top-level `invoke`

pub mod attendant;
pub mod classification;
pub mod classifier;
pub mod handlers;
pub mod synthesizer;

pub use attendant::{AttendantResponse, AttendantWorkflow, AttendantWorkflowBuilder};
pub use classification::{Classification, ClassificationOutput, HandlerId, RuleClassifier};
pub use handlers::{HandlerNode, HandlerResult};
