// SPDX-License-Identifier: MIT

//! Application configuration: YAML types, loading and collaborator construction

pub mod factory;
pub mod loader;
pub mod types;

pub use factory::{build_workflow, create_model, infer_provider_from_model, Provider};
pub use loader::ConfigLoader;
pub use types::{AppConfig, ModelSettings, ModelsConfig, ServerConfig};
