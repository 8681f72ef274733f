//! Google Cloud Text-to-Speech client

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::ProxyConfig;
use crate::core::credentials::{Credentials, SecretKey};
use crate::core::errors::{ProxyError, Result};
use crate::core::models::SpeechRequest;

/// Voice gender used when the caller does not ask for one
pub const DEFAULT_SSML_GENDER: &str = "FEMALE";

/// Speech synthesis capability
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech and return MP3 bytes
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

/// Client for the Google Cloud Text-to-Speech v1 REST API
#[derive(Debug, Clone)]
pub struct GoogleSpeechClient {
    client: reqwest::Client,
    endpoint: String,
    key: SecretKey,
}

impl GoogleSpeechClient {
    /// Create a client with the given per-request timeout
    pub fn new(endpoint: impl Into<String>, key: SecretKey, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key,
        })
    }

    /// Create a client from config and resolved credentials
    pub fn from_config(config: &ProxyConfig, credentials: &Credentials) -> Result<Self> {
        Self::new(
            config.tts_endpoint.clone(),
            credentials.tts_key.clone(),
            config.item_timeout(),
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        let body = SynthesizeBody {
            input: SynthesisInput { text: &request.text },
            voice: VoiceSelection {
                language_code: &request.language_code,
                name: request.voice_name.as_deref(),
                ssml_gender: request.ssml_gender.as_deref().unwrap_or(DEFAULT_SSML_GENDER),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        debug!(
            "Synthesizing {} chars in {}",
            request.text.chars().count(),
            request.language_code
        );

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.endpoint))
            .header("X-Goog-Api-Key", self.key.expose())
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
            let error_text = response.text().await.unwrap_or_default();
            warn!("Text-to-Speech returned {}: {}", status.as_u16(), error_text);
            return Err(ProxyError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let payload: SynthesizeResponse =
            response.json().await.map_err(|e| ProxyError::InvalidResponse {
                message: e.to_string(),
            })?;

        let audio = payload
            .audio_content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProxyError::InvalidResponse {
                message: "No audioContent in response".to_string(),
            })?;

        Ok(base64::engine::general_purpose::STANDARD.decode(audio)?)
    }
}
