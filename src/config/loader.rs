use super::AgentConfig;
use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds an [`AgentConfig`] from defaults, a TOML file and the environment
pub struct ConfigLoader {
    lookup: EnvLookup,
    load_dotenv: bool,
}

impl ConfigLoader {
    /// Read overrides from the process environment and `.env`
    pub fn new() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
            load_dotenv: true,
        }
    }

    /// Read overrides from `lookup` only
    pub fn with_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
            load_dotenv: false,
        }
    }

    pub async fn load(&self, path: Option<&Path>) -> Result<AgentConfig> {
        if self.load_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!("Loaded environment from {}", path.display()),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(Error::Config(format!("Failed to read .env: {e}"))),
            }
        }

        let mut config = match path {
            Some(path) => Self::load_file(path).await?,
            None => AgentConfig::new(),
        };
        config.merge_env_with(&self.lookup);
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<AgentConfig> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: AgentConfig = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
