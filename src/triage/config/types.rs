// SPDX-License-Identifier: MIT

//! Application configuration types

use crate::adk::model::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model used by one role of the attendant workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// `ollama` or `openai`; inferred from the model name when absent
    #[serde(default)]
    pub provider: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            provider: None,
            model_name: model_name.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Generation settings, or `None` when nothing is tuned
    pub fn generation_config(&self) -> Option<GenerationConfig> {
        if self.temperature.is_none() && self.max_output_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            ..Default::default()
        })
    }
}

fn default_classifier() -> ModelSettings {
    ModelSettings::new("llama3.1:8b").with_temperature(0.0)
}

fn default_small() -> ModelSettings {
    ModelSettings::new("llama3.2:1b")
}

fn default_blog() -> ModelSettings {
    ModelSettings::new("llama3.2:1b").with_temperature(0.1)
}

/// Per-role model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_classifier")]
    pub classifier: ModelSettings,
    #[serde(default = "default_small")]
    pub appointments: ModelSettings,
    #[serde(default = "default_small")]
    pub medical_qa: ModelSettings,
    #[serde(default = "default_blog")]
    pub blog: ModelSettings,
    #[serde(default = "default_small")]
    pub synthesizer: ModelSettings,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier: default_classifier(),
            appointments: default_small(),
            medical_qa: default_small(),
            blog: default_blog(),
            synthesizer: default_small(),
        }
    }
}

impl ModelsConfig {
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ModelSettings> {
        [
            &mut self.classifier,
            &mut self.appointments,
            &mut self.medical_qa,
            &mut self.blog,
            &mut self.synthesizer,
        ]
        .into_iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ModelSettings)> {
        [
            ("classifier", &self.classifier),
            ("appointments", &self.appointments),
            ("medical_qa", &self.medical_qa),
            ("blog", &self.blog),
            ("synthesizer", &self.synthesizer),
        ]
        .into_iter()
    }
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_recursion_limit() -> usize {
    25
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    /// Directory of `.md`/`.txt` posts served to the blog handler
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            recursion_limit: default_recursion_limit(),
            documents_dir: None,
            server: ServerConfig::default(),
        }
    }
}
