//! Text-generation collaborators.
//!
//! The engine talks to the model server through two narrow traits:
//! [`Generator`] turns a prompt into text, and [`BackendDiscovery`] reports
//! whether a server is reachable and which models it serves. [`ollama`]
//! implements both over HTTP.

pub mod ollama;

use std::ops::RangeInclusive;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::ValidationError;

/// Accepted sampling temperatures.
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.1..=2.0;

/// Accepted response lengths, in tokens.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 50..=500;

pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Ways a generation call can fail. Each maps to a user-facing message via
/// [`GenerationError::render`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("AI timeout - model may be too large or busy")]
    Timeout,

    #[error("Cannot connect to AI backend - is it running?")]
    ConnectionUnavailable,

    #[error("Unexpected response format from AI")]
    MalformedResponse,

    #[error("AI error: {0}")]
    Other(String),
}

impl GenerationError {
    /// Text shown in place of the reply when a turn fails.
    pub fn render(&self) -> String {
        let glyph = match self {
            Self::Timeout => "⏱️ ",
            Self::ConnectionUnavailable => "🔌 ",
            Self::MalformedResponse => "📦 ",
            Self::Other(_) => "",
        };
        format!("❌ {glyph}{self}")
    }
}

/// Sampling settings for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    /// Model identifier. Empty means "first model the backend serves".
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn new(
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, ValidationError> {
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(ValidationError::TemperatureOutOfRange(temperature));
        }
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(ValidationError::MaxTokensOutOfRange(max_tokens));
        }
        Ok(Self {
            model: model.into(),
            temperature,
            max_tokens,
        })
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// What discovery last reported about the model server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub available: bool,
    pub models: Vec<String>,
}

impl BackendStatus {
    pub fn available(models: Vec<String>) -> Self {
        Self {
            available: true,
            models,
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn serves(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

/// A text-completion backend. Implementations must not panic; every failure
/// is reported as a [`GenerationError`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;
}

/// Reports reachability and served models. Unreachable servers are reported
/// as [`BackendStatus::unavailable`], never as an error.
#[async_trait]
pub trait BackendDiscovery: Send + Sync {
    async fn discover(&self) -> BackendStatus;
}
