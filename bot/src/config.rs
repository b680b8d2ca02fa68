//! Application configuration: TOML file plus environment overrides

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use swingbot_core::{Error, Result};
use swingbot_engine::ExecutorConfig;
use swingbot_networking::http::{DEFAULT_BASE_URL, DEFAULT_PUBLIC_URL};
use swingbot_networking::{Credentials, PaperConfig};
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "SWINGBOT_API_KEY";
pub const API_SECRET_ENV: &str = "SWINGBOT_API_SECRET";

/// Exchange connection settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Trade against the in-memory paper exchange instead of the live API
    #[serde(default)]
    pub paper: bool,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_public_url() -> String { DEFAULT_PUBLIC_URL.to_string() }

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_base_url(),
            public_url: default_public_url(),
            paper: false,
        }
    }
}

impl ExchangeSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
        }
    }
}

/// Everything the binary reads at startup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Let credentials from the environment win over the file
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.exchange.api_key = key;
        }
        if let Some(secret) = lookup(API_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.exchange.api_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.executor.check_interval_secs == 0 {
            return Err(Error::ConfigError(
                "executor.check_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.executor.max_wait_secs == Some(0) {
            return Err(Error::ConfigError(
                "executor.max_wait_secs must be at least 1 when set".to_string(),
            ));
        }
        if !self.exchange.paper
            && (self.exchange.api_key.is_empty() || self.exchange.api_secret.is_empty())
        {
            return Err(Error::ConfigError(format!(
                "exchange credentials missing: set exchange.api_key/api_secret or {}/{}",
                API_KEY_ENV, API_SECRET_ENV
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_full_document() {
        let config = AppConfig::from_toml_str(
            r#"
            [exchange]
            api_key = "key"
            api_secret = "secret"

            [executor]
            check_interval_secs = 5
            max_wait_secs = 600

            [paper]
            fill_after_polls = 3
            [paper.balances]
            USD = 250.0
            "#,
        )
        .unwrap();

        assert_eq!(config.exchange.api_key, "key");
        assert_eq!(config.exchange.base_url, DEFAULT_BASE_URL);
        assert!(!config.exchange.paper);
        assert_eq!(config.executor.check_interval_secs, 5);
        assert_eq!(config.executor.max_wait_secs, Some(600));
        assert_eq!(config.paper.fill_after_polls, 3);
        assert_eq!(config.paper.balances.get("USD"), Some(&250.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.executor.check_interval_secs, 15);
        assert_eq!(config.executor.max_wait_secs, None);
    }

    #[test]
    fn test_env_overrides_file_credentials() {
        let mut config = AppConfig::from_toml_str("[exchange]\napi_key = \"file\"\n").unwrap();
        let env = HashMap::from([
            (API_KEY_ENV, "env-key".to_string()),
            (API_SECRET_ENV, "env-secret".to_string()),
        ]);

        config.apply_env_overrides(|name| env.get(name).cloned());

        assert_eq!(config.exchange.api_key, "env-key");
        assert_eq!(config.exchange.api_secret, "env-secret");
    }

    #[test]
    fn test_validation() {
        let live = AppConfig::default();
        assert!(matches!(live.validate(), Err(Error::ConfigError(_))));

        let mut paper = AppConfig::default();
        paper.exchange.paper = true;
        assert!(paper.validate().is_ok());

        paper.executor.check_interval_secs = 0;
        assert!(matches!(paper.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = AppConfig::from_toml_str("[executor]\ncheck_interval_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
