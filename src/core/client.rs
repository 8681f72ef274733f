//! Microsoft Translator client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::ProxyConfig;
use crate::core::credentials::{Credentials, SecretKey};
use crate::core::errors::{ProxyError, Result};

/// Translation capability consumed by the batch dispatcher and the HTTP layer
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_lang`, returning the translated text
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranslateResponseItem {
    #[serde(default)]
    translations: Vec<TranslationEntry>,
}

#[derive(Debug, Deserialize)]
struct TranslationEntry {
    text: Option<String>,
}

/// Client for the Microsoft Translator v3 REST API
#[derive(Debug, Clone)]
pub struct MicrosoftTranslator {
    client: reqwest::Client,
    endpoint: String,
    key: SecretKey,
    region: String,
}

impl MicrosoftTranslator {
    /// Create a new translator client
    pub fn new(
        endpoint: impl Into<String>,
        key: SecretKey,
        region: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key,
            region: region.into(),
        })
    }

    /// Create from loaded configuration and credentials
    pub fn from_config(config: &ProxyConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            config.translator_endpoint.clone(),
            credentials.translator_key.clone(),
            credentials.translator_region.clone(),
            config.item_timeout(),
        )
    }
}

#[async_trait]
impl Translator for MicrosoftTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let url = format!("{}/translate", self.endpoint);
        let body = serde_json::json!([{ "Text": text }]);

        debug!("Translating {} chars into {}", text.chars().count(), target_lang);

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", "3.0"), ("to", target_lang)])
            .header("Ocp-Apim-Subscription-Key", self.key.expose())
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProxyError::Timeout
                } else {
                    ProxyError::Network {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Translator returned {}: {}", status_code, error_text);

            return Err(ProxyError::Api {
                status: status_code,
                message: error_text,
            });
        }

        let items: Vec<TranslateResponseItem> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProxyError::Timeout
            } else {
                ProxyError::InvalidResponse {
                    message: e.to_string(),
                }
            }
        })?;

        items
            .into_iter()
            .next()
            .and_then(|item| item.translations.into_iter().next())
            .and_then(|entry| entry.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProxyError::InvalidResponse {
                message: "No translation in response".to_string(),
            })
    }
}
