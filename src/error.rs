//! Error taxonomy for the character and memory engine.
//!
//! [`ValidationError`] covers bad user input and is always recovered locally.
//! [`EngineError`] is what registry and session operations return. Generation
//! failures live in [`crate::generation::GenerationError`] because they are
//! reported inside a turn outcome rather than as an operation failure.

use thiserror::Error;

use crate::character::UNSAFE_NAME_CHARS;
use crate::generation::{MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::store::StoreError;

/// Rejected user input. No state is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name must be at least 2 characters")]
    NameTooShort,

    #[error("Name too long (max 50 characters)")]
    NameTooLong,

    #[error("Name contains invalid characters: {}", unsafe_chars_list())]
    UnsafeNameCharacters,

    #[error("Personality is required!")]
    EmptyPersonality,

    #[error("Enter a fact")]
    EmptyFact,

    #[error("Describe the moment")]
    EmptyMoment,

    #[error(
        "temperature {0} out of range ({lo}..={hi})",
        lo = TEMPERATURE_RANGE.start(),
        hi = TEMPERATURE_RANGE.end()
    )]
    TemperatureOutOfRange(f32),

    #[error(
        "max_tokens {0} out of range ({lo}..={hi})",
        lo = MAX_TOKENS_RANGE.start(),
        hi = MAX_TOKENS_RANGE.end()
    )]
    MaxTokensOutOfRange(u32),
}

fn unsafe_chars_list() -> String {
    UNSAFE_NAME_CHARS
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors surfaced by the registry and the conversation session.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Character '{0}' already exists!")]
    DuplicateName(String),

    #[error("{}", character_not_found(.0))]
    CharacterNotFound(String),

    #[error("Failed to save: {0}")]
    Persistence(#[from] StoreError),

    #[error("No AI backend detected. Start Ollama and run `eliza status`.")]
    BackendUnavailable,

    #[error("Model '{0}' not available. Run `eliza status` to list models.")]
    ModelNotAvailable(String),

    #[error("a reply for '{0}' is still being generated")]
    TurnInProgress(String),
}

fn character_not_found(name: &str) -> String {
    if name.trim().is_empty() {
        "Please select a character first.".to_string()
    } else {
        format!("Character '{name}' not found")
    }
}
