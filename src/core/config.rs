//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::errors::{ProxyError, Result};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local work: development fallback keys and error details are allowed
    #[default]
    Development,
    /// Deployed service
    Production,
}

impl Environment {
    /// Whether this is the production environment
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Configuration for the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind host
    pub host: String,
    /// Listen port, overridden by `PORT`
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Microsoft Translator base URL
    pub translator_endpoint: String,
    /// Microsoft Translator resource region
    pub translator_region: String,
    /// Google Text-to-Speech base URL
    pub tts_endpoint: String,
    /// Largest accepted batch
    pub max_batch_size: usize,
    /// Per-item upstream timeout in milliseconds
    pub item_timeout_ms: u64,
    /// Directory holding mounted secret files
    pub secrets_dir: PathBuf,
    /// Secret file name for the translator key
    pub translator_key_file: String,
    /// Secret file name for the TTS key
    pub tts_key_file: String,
    /// Only honoured outside production
    pub dev_translator_key: Option<String>,
    /// Only honoured outside production
    pub dev_tts_key: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            translator_endpoint: "https://api.cognitive.microsofttranslator.com".to_string(),
            translator_region: "eastus".to_string(),
            tts_endpoint: "https://texttospeech.googleapis.com".to_string(),
            max_batch_size: 25,
            item_timeout_ms: 10_000,
            secrets_dir: PathBuf::from("/etc/secrets"),
            translator_key_file: "CHAVE_TRADUTOR".to_string(),
            tts_key_file: "CHAVE_GOOGLE_TTS".to_string(),
            dev_translator_key: None,
            dev_tts_key: None,
        }
    }
}

impl ProxyConfig {
    /// Load configuration: defaults, then an optional file, then `PROXY_*` variables.
    /// A plain `PORT` variable wins over everything for the listen port.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let mut config: Self = builder
            .add_source(config::Environment::with_prefix("PROXY").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().map_err(|_| ProxyError::Config {
                message: format!("PORT must be a valid port number, got '{}'", port),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(config_error("max_batch_size must be greater than 0"));
        }

        if self.item_timeout_ms == 0 {
            return Err(config_error("item_timeout_ms must be greater than 0"));
        }

        for (name, endpoint) in [
            ("translator_endpoint", &self.translator_endpoint),
            ("tts_endpoint", &self.tts_endpoint),
        ] {
            if endpoint.is_empty() {
                return Err(config_error(format!("{} is required", name)));
            }
            if reqwest::Url::parse(endpoint).is_err() {
                return Err(config_error(format!("{} is not a valid URL: {}", name, endpoint)));
            }
        }

        if self.environment.is_production()
            && (self.dev_translator_key.is_some() || self.dev_tts_key.is_some())
        {
            warn!("Development fallback keys are ignored in production");
        }

        Ok(())
    }

    /// Timeout applied to each upstream call
    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    /// Listen address as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_error(message: impl Into<String>) -> ProxyError {
    ProxyError::Config {
        message: message.into(),
    }
}
