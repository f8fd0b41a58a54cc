//! Ollama HTTP backend.
//!
//! Generation uses `POST /api/generate` with streaming disabled; discovery
//! uses `GET /api/tags`. Transport errors are mapped onto [`GenerationError`]
//! so the session can show a specific message for each.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BackendDiscovery, BackendStatus, GenerationError, GenerationParams, Generator};
use crate::config::BackendConfig;

/// Ollama client for generation and model discovery.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    discovery_timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    pub fn new(config: &BackendConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            discovery_timeout: Duration::from_secs(config.discovery_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_models(&self) -> Result<Vec<String>, reqwest::Error> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.discovery_timeout)
            .send()
            .await?
            .error_for_status()?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &params.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        tracing::debug!(
            model = %params.model,
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "sending generate request"
        );

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Other(format!("HTTP {status}: {}", body.trim())));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        parse_generate_body(&body)
    }
}

#[async_trait]
impl BackendDiscovery for OllamaClient {
    async fn discover(&self) -> BackendStatus {
        match self.fetch_models().await {
            Ok(models) => {
                tracing::info!(url = %self.base_url, models = models.len(), "ollama reachable");
                BackendStatus::available(models)
            }
            Err(e) => {
                tracing::info!(url = %self.base_url, error = %e, "ollama not reachable");
                BackendStatus::unavailable()
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else if e.is_connect() {
        GenerationError::ConnectionUnavailable
    } else if e.is_decode() {
        GenerationError::MalformedResponse
    } else {
        GenerationError::Other(e.to_string())
    }
}

fn parse_generate_body(body: &str) -> Result<String, GenerationError> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|r| r.response)
        .map_err(|_| GenerationError::MalformedResponse)
}
