use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Context, Result, anyhow};

use crate::provider::Provider;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub history_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Groq.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Groq)
    }

    /// Model to request; a stored model only applies to the stored provider
    pub fn model_for(&self, provider: Provider) -> String {
        match &self.model {
            Some(model) if provider == self.provider() => model.clone(),
            _ => provider.default_model().to_string(),
        }
    }

    pub fn base_url_for(&self, provider: Provider) -> String {
        match &self.base_url {
            Some(url) if provider == self.provider() => url.trim_end_matches('/').to_string(),
            _ => provider.default_base_url().to_string(),
        }
    }

    /// Resolve the bearer token: environment first, then the stored key
    pub fn api_key_for(&self, provider: Provider) -> Option<String> {
        let env_key = provider
            .api_key_env()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.trim().is_empty());

        env_key.or_else(|| match provider {
            Provider::Groq => self.groq_api_key.clone(),
            Provider::OpenAI => self.openai_api_key.clone(),
            Provider::Ollama => None,
        })
    }

    /// Returns where the API key for a provider comes from: "env", "config", "local", or None
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        let Some(var) = provider.api_key_env() else {
            return Some("local");
        };
        if std::env::var(var).map(|k| !k.trim().is_empty()).unwrap_or(false) {
            return Some("env");
        }
        let stored = match provider {
            Provider::Groq => self.groq_api_key.is_some(),
            Provider::OpenAI => self.openai_api_key.is_some(),
            Provider::Ollama => false,
        };
        stored.then_some("config")
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        match provider {
            Provider::Groq => self.groq_api_key = Some(key.to_string()),
            Provider::OpenAI => self.openai_api_key = Some(key.to_string()),
            Provider::Ollama => {}
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("bhojanbytes").join("history.json"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("bhojanbytes").join("config.json"))
    }
}
