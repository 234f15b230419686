// SPDX-License-Identifier: MIT

//! Configuration loader - YAML file plus environment overrides

use super::types::AppConfig;
use crate::adk::error::ConfigError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads [`AppConfig`] from YAML and the process environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the file at `path` if given, otherwise start from defaults, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => AppConfig::default(),
        };
        Self::apply_env_overrides(&mut config, |key| env::var(key).ok());
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(content: &str) -> Result<AppConfig, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `MODEL_PROVIDER`, `MODEL_NAME` and `TRIAGE_DOCUMENTS_DIR`.
    ///
    /// Provider and model name apply to every role. Endpoint variables
    /// (`OLLAMA_BASE_URL`, `OPENAI_*`) are read by the model clients themselves.
    pub fn apply_env_overrides<F>(config: &mut AppConfig, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("MODEL_PROVIDER") {
            log::debug!("MODEL_PROVIDER override: {}", provider);
            for settings in config.models.iter_mut() {
                settings.provider = Some(provider.clone());
            }
        }
        if let Some(model_name) = non_empty("MODEL_NAME") {
            log::debug!("MODEL_NAME override: {}", model_name);
            for settings in config.models.iter_mut() {
                settings.model_name = model_name.clone();
            }
        }
        if let Some(dir) = non_empty("TRIAGE_DOCUMENTS_DIR") {
            config.documents_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.recursion_limit == 0 {
            return Err(ConfigError::Invalid(
                "recursion_limit must be at least 1".into(),
            ));
        }
        for (role, settings) in config.models.iter() {
            if settings.model_name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model_name for '{}' is empty",
                    role
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.models.classifier.model_name, "llama3.1:8b");
        assert_eq!(config.models.classifier.temperature, Some(0.0));
        assert_eq!(config.models.synthesizer.model_name, "llama3.2:1b");
        assert_eq!(config.recursion_limit, 25);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
models:
  classifier:
    provider: openai
    model_name: gpt-4o-mini
    temperature: 0
  blog:
    model_name: llama3.2:3b
documents_dir: ./posts
server:
  port: 8080
"#;
        let config = ConfigLoader::parse_yaml(yaml).unwrap();
        assert_eq!(config.models.classifier.provider.as_deref(), Some("openai"));
        assert_eq!(config.models.blog.model_name, "llama3.2:3b");
        assert_eq!(config.models.blog.temperature, None);
        assert_eq!(config.models.appointments.model_name, "llama3.2:1b");
        assert_eq!(config.documents_dir, Some(PathBuf::from("./posts")));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.recursion_limit, 25);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ConfigLoader::parse_yaml("models: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MODEL_PROVIDER", "openai"),
            ("MODEL_NAME", "gpt-4o-mini"),
            ("TRIAGE_DOCUMENTS_DIR", "/data/posts"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        ConfigLoader::apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        for (_, settings) in config.models.iter() {
            assert_eq!(settings.provider.as_deref(), Some("openai"));
            assert_eq!(settings.model_name, "gpt-4o-mini");
        }
        assert_eq!(config.documents_dir, Some(PathBuf::from("/data/posts")));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = AppConfig::default();
        ConfigLoader::apply_env_overrides(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_recursion_limit() {
        let config = AppConfig {
            recursion_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_file("/nonexistent/triage.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
