//! Credential resolution for the upstream APIs
//!
//! Each key is looked up in the environment first, then in a mounted secret
//! file, then in the development fallback from the config. Resolution runs
//! once at startup and the resulting [`Credentials`] are passed explicitly to
//! the clients that need them.

use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::config::ProxyConfig;
use crate::core::errors::{ProxyError, Result};

/// Environment variable holding the Microsoft Translator key
pub const TRANSLATOR_KEY_VAR: &str = "TRANSLATOR_KEY";
/// Environment variable overriding the Microsoft Translator region
pub const TRANSLATOR_REGION_VAR: &str = "TRANSLATOR_REGION";
/// Environment variable holding the Google Text-to-Speech API key
pub const TTS_KEY_VAR: &str = "GOOGLE_TTS_KEY";

/// An API key whose value never shows up in `Debug` output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a raw key
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw key, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Where a key was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Process environment variable
    Environment,
    /// File under the secrets directory
    SecretFile,
    /// Development key from the config
    DevelopmentFallback,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Environment => write!(f, "environment"),
            KeySource::SecretFile => write!(f, "secret file"),
            KeySource::DevelopmentFallback => write!(f, "development fallback"),
        }
    }
}

/// Resolved credentials for both upstream APIs
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Microsoft Translator subscription key
    pub translator_key: SecretKey,
    /// Microsoft Translator resource region
    pub translator_region: String,
    /// Google Text-to-Speech API key
    pub tts_key: SecretKey,
}

/// Resolves credentials from the environment, the secrets directory, and config
pub struct CredentialSource<'a> {
    config: &'a ProxyConfig,
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> CredentialSource<'a> {
    /// Resolve against the real process environment
    pub fn new(config: &'a ProxyConfig) -> Self {
        Self::with_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup
    pub fn with_lookup(config: &'a ProxyConfig, lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            config,
            lookup: Box::new(lookup),
        }
    }

    /// Resolve every credential, failing on the first missing one
    pub fn resolve(&self) -> Result<Credentials> {
        let (translator_key, source) = self.resolve_key(
            TRANSLATOR_KEY_VAR,
            &self.config.translator_key_file,
            self.config.dev_translator_key.as_deref(),
        )?;
        info!("Microsoft Translator key loaded from {}", source);

        let (tts_key, source) = self.resolve_key(
            TTS_KEY_VAR,
            &self.config.tts_key_file,
            self.config.dev_tts_key.as_deref(),
        )?;
        info!("Google TTS key loaded from {}", source);

        let translator_region = self
            .env(TRANSLATOR_REGION_VAR)
            .unwrap_or_else(|| self.config.translator_region.clone());

        Ok(Credentials {
            translator_key,
            translator_region,
            tts_key,
        })
    }

    /// Report which keys can be resolved without failing
    pub fn availability(&self) -> (Option<KeySource>, Option<KeySource>) {
        let translator = self
            .resolve_key(
                TRANSLATOR_KEY_VAR,
                &self.config.translator_key_file,
                self.config.dev_translator_key.as_deref(),
            )
            .ok()
            .map(|(_, source)| source);
        let tts = self
            .resolve_key(TTS_KEY_VAR, &self.config.tts_key_file, self.config.dev_tts_key.as_deref())
            .ok()
            .map(|(_, source)| source);
        (translator, tts)
    }

    fn resolve_key(
        &self,
        var: &str,
        file_name: &str,
        dev_fallback: Option<&str>,
    ) -> Result<(SecretKey, KeySource)> {
        if let Some(value) = self.env(var) {
            return Ok((SecretKey::new(value), KeySource::Environment));
        }

        let path = self.config.secrets_dir.join(file_name);
        if let Some(value) = read_secret_file(&path)? {
            return Ok((SecretKey::new(value), KeySource::SecretFile));
        }

        match dev_fallback.filter(|key| !key.trim().is_empty()) {
            Some(key) if !self.config.environment.is_production() => {
                warn!("Using development fallback for {}", var);
                Ok((SecretKey::new(key.trim()), KeySource::DevelopmentFallback))
            }
            _ => Err(ProxyError::MissingCredential {
                name: format!("{} (env) or {}", var, path.display()),
            }),
        }
    }

    fn env(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

fn read_secret_file(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        debug!("Secret file not found: {}", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let content = content.trim();
    if content.is_empty() {
        warn!("Secret file is empty: {}", path.display());
        return Ok(None);
    }

    Ok(Some(content.to_string()))
}
