// SPDX-License-Identifier: MIT

//! Builds models, agents and the attendant workflow from [`AppConfig`]

use super::types::{AppConfig, ModelSettings};
use crate::adk::error::{BoxError, ModelError};
use crate::adk::model::ollama::OllamaModel;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::Model;
use crate::triage::graph::GraphConfig;
use crate::triage::tools::{DocumentStore, InMemoryDocumentStore};
use crate::triage::workflow::handlers::{appointments_agent, blog_agent, medical_qa_agent};
use crate::triage::workflow::{AttendantWorkflow, HandlerId};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAI,
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAI),
            _ => Err(ModelError::UnknownProvider(s.to_string())),
        }
    }
}

/// Guess the provider from a model name; anything unrecognised is served by Ollama
pub fn infer_provider_from_model(model_name: &str) -> Provider {
    let name_lower = model_name.to_lowercase();
    if name_lower.starts_with("gpt")
        || name_lower.starts_with("o1")
        || name_lower.starts_with("o3")
        || name_lower.starts_with("o4")
    {
        Provider::OpenAI
    } else {
        Provider::Ollama
    }
}

/// Create the model client for one role
pub fn create_model(settings: &ModelSettings) -> Result<Arc<dyn Model>, ModelError> {
    let provider = match &settings.provider {
        Some(name) => name.parse()?,
        None => infer_provider_from_model(&settings.model_name),
    };
    log::debug!(
        "Using provider {:?} with model '{}'",
        provider,
        settings.model_name
    );

    match provider {
        Provider::Ollama => Ok(Arc::new(OllamaModel::new(settings.model_name.clone()))),
        Provider::OpenAI => Ok(Arc::new(OpenAIModel::new(settings.model_name.clone())?)),
    }
}

/// Load the blog corpus; a missing directory setting gives an empty store
pub fn create_document_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, BoxError> {
    match &config.documents_dir {
        Some(dir) => Ok(Arc::new(InMemoryDocumentStore::from_dir(dir)?)),
        None => {
            log::warn!("No documents_dir configured, blog handler will find nothing");
            Ok(Arc::new(InMemoryDocumentStore::default()))
        }
    }
}

/// Wire every collaborator described by `config` into an attendant workflow
pub fn build_workflow(config: &AppConfig) -> Result<AttendantWorkflow, BoxError> {
    let models = &config.models;
    let store = create_document_store(config)?;

    let mut builder = AttendantWorkflow::builder()
        .classifier_model(create_model(&models.classifier)?)
        .synthesizer_model(create_model(&models.synthesizer)?)
        .handler(
            HandlerId::Appointments,
            Arc::new(appointments_agent(
                create_model(&models.appointments)?,
                models.appointments.generation_config(),
            )),
        )
        .handler(
            HandlerId::MedicalQa,
            Arc::new(medical_qa_agent(
                create_model(&models.medical_qa)?,
                models.medical_qa.generation_config(),
            )),
        )
        .handler(
            HandlerId::Blog,
            Arc::new(blog_agent(
                create_model(&models.blog)?,
                store,
                models.blog.generation_config(),
            )),
        )
        .graph_config(GraphConfig {
            recursion_limit: config.recursion_limit,
        });

    if let Some(generation) = models.classifier.generation_config() {
        builder = builder.classifier_config(generation);
    }
    if let Some(generation) = models.synthesizer.generation_config() {
        builder = builder.synthesizer_config(generation);
    }

    Ok(builder.build()?)
}
