//! Command-line handlers and the setup they share.

pub mod characters;
pub mod chat;
pub mod doctor;
pub mod export;
pub mod import;
pub mod memory;
pub mod status;

use anyhow::{Context, Result};

use eliza::config::ElizaConfig;
use eliza::generation::ollama::OllamaClient;
use eliza::store::SqliteStore;
use eliza::CharacterRegistry;

/// Open the configured database and load every character.
pub fn open_registry(config: &ElizaConfig) -> Result<CharacterRegistry> {
    let conn = eliza::db::open_database(config.resolved_db_path())?;
    CharacterRegistry::open(Box::new(SqliteStore::new(conn))).context("failed to load characters")
}

pub fn backend_client(config: &ElizaConfig) -> Result<OllamaClient> {
    OllamaClient::new(&config.backend).context("failed to create backend client")
}
