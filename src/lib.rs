//! Persona chat engine with per-character long-term memory.
//!
//! ELIZA keeps a registry of user-defined characters. Each one has a profile,
//! a bounded chat history, and a memory bank of facts, preferences, and tagged
//! moments learned from conversation. Every turn composes a prompt from all
//! three and hands it to a text-generation backend (Ollama by default).
//!
//! # Architecture
//!
//! - **Storage**: SQLite, one JSON document per character per record kind,
//!   saved atomically
//! - **Memory**: pattern-based extraction behind the [`memory::Extractor`] trait
//! - **Generation**: async [`generation::Generator`] and
//!   [`generation::BackendDiscovery`] traits, with an HTTP client for Ollama
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`store`]: the persistence contract and its SQLite implementation
//! - [`registry`]: characters with their history and memory, kept in lockstep
//! - [`session`]: conversational turns against a generation backend
//! - [`prompt`]: prompt composition

pub mod character;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod history;
pub mod memory;
pub mod prompt;
pub mod registry;
pub mod session;
pub mod store;

pub use character::{Character, CharacterUpdate, NewCharacter};
pub use error::{EngineError, ValidationError};
pub use history::{ChatHistory, Turn};
pub use memory::MemoryBank;
pub use registry::CharacterRegistry;
pub use session::{ConversationSession, TurnOutcome};
