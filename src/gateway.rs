//! Boundary to the text-to-speech service.
//!
//! A gateway turns narration text into a [`ResourceHandle`] registered in the
//! session's [`BlobStore`]. It never retries and never releases handles; the
//! controller owns both policies.

use crate::config::AppConfig;
use crate::error::GenerationError;
use crate::resource::{BlobStore, ResourceHandle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

#[async_trait]
pub trait SpeechGateway: Send + Sync {
    async fn generate(&self, text: &str) -> Result<ResourceHandle, GenerationError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SpeechErrorBody {
    error: String,
}

/// HTTP gateway: `POST {text}` and receive raw audio bytes.
pub struct HttpSpeechGateway {
    client: reqwest::Client,
    endpoint: String,
    voice: Option<String>,
    blobs: BlobStore,
}

impl HttpSpeechGateway {
    pub fn new(config: &AppConfig, blobs: BlobStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.tts_timeout())
            .build()
            .context("Building speech HTTP client")?;
        info!(
            endpoint = %config.tts_endpoint,
            voice = config.tts_voice.as_deref().unwrap_or("default"),
            timeout_secs = config.tts_timeout_secs,
            "Initializing speech gateway"
        );
        Ok(Self {
            client,
            endpoint: config.tts_endpoint.clone(),
            voice: config.tts_voice.clone(),
            blobs,
        })
    }
}

#[async_trait]
impl SpeechGateway for HttpSpeechGateway {
    async fn generate(&self, text: &str) -> Result<ResourceHandle, GenerationError> {
        let started = Instant::now();
        debug!(chars = text.len(), endpoint = %self.endpoint, "Requesting narration audio");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SpeechRequest {
                text,
                voice: self.voice.as_deref(),
            })
            .send()
            .await
            .map_err(|err| GenerationError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| GenerationError::Network(err.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), %message, "Speech service rejected request");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }
        if body.is_empty() {
            return Err(GenerationError::EmptyPayload);
        }

        let handle = self.blobs.create(body.to_vec());
        debug!(
            handle = %handle,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Narration audio ready"
        );
        Ok(handle)
    }
}

/// Prefer the service's structured `{ "error": ... }` body over raw text.
fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<SpeechErrorBody>(body) {
        return parsed.error;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "no error detail".to_string()
    } else {
        text.chars().take(200).collect()
    }
}
