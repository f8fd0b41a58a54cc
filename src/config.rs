//! Configuration from `~/.eliza/config.toml` with `ELIZA_*` environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::generation::{GenerationParams, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ElizaConfig {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub backend: BackendConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    /// Empty means "first model the backend reports".
    pub model: String,
    pub request_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub auto_memory: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_eliza_dir()
            .join("eliza.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".into(),
            model: String::new(),
            request_timeout_secs: 120,
            discovery_timeout_secs: 2,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            auto_memory: true,
        }
    }
}

/// Returns `~/.eliza/`
pub fn default_eliza_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eliza")
}

/// Returns the default config file path: `~/.eliza/config.toml`
pub fn default_config_path() -> PathBuf {
    default_eliza_dir().join("config.toml")
}

impl ElizaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ElizaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ELIZA_DB, ELIZA_LOG_LEVEL,
    /// ELIZA_BACKEND_URL, ELIZA_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ELIZA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ELIZA_LOG_LEVEL") {
            self.general.log_level = val;
        }
        if let Ok(val) = std::env::var("ELIZA_BACKEND_URL") {
            self.backend.url = val;
        }
        if let Ok(val) = std::env::var("ELIZA_MODEL") {
            self.backend.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Generation settings from config, validated against the accepted ranges.
    pub fn generation_params(&self) -> Result<GenerationParams> {
        GenerationParams::new(
            self.backend.model.clone(),
            self.generation.temperature,
            self.generation.max_tokens,
        )
        .context("invalid [generation] settings")
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
