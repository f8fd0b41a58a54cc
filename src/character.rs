//! Character definitions.
//!
//! A [`Character`] is the persona record persisted 1:1 in the store. Its `name`
//! is the primary key shared by the character's history and memory bank, so
//! it is validated once at creation by [`validate_name`] and never changes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Characters that would make a name unsafe as a storage key or file name.
pub const UNSAFE_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Minimum name length, in characters.
pub const MIN_NAME_LEN: usize = 2;

/// Maximum name length, in characters.
pub const MAX_NAME_LEN: usize = 50;

const AVATARS: [&str; 10] = ["👤", "🎭", "🦊", "🐺", "🦁", "🐯", "🐱", "🐶", "🐼", "🐨"];

/// A persona definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub personality: String,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub example_dialogue: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created: String,
    /// Display glyph derived from the first letter of the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Input for creating a character. Fields are raw user input; trimming and
/// validation happen in [`Character::from_new`].
#[derive(Debug, Clone, Default)]
pub struct NewCharacter {
    pub name: String,
    pub personality: String,
    pub backstory: Option<String>,
    pub appearance: Option<String>,
    pub example_dialogue: Option<String>,
}

impl NewCharacter {
    pub fn new(name: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            personality: personality.into(),
            ..Default::default()
        }
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    pub fn appearance(mut self, appearance: impl Into<String>) -> Self {
        self.appearance = Some(appearance.into());
        self
    }

    pub fn example_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.example_dialogue = Some(dialogue.into());
        self
    }
}

/// An explicit edit. `None` leaves a field as it is; `Some("")` clears an
/// optional field. The name cannot be edited.
#[derive(Debug, Clone, Default)]
pub struct CharacterUpdate {
    pub personality: Option<String>,
    pub backstory: Option<String>,
    pub appearance: Option<String>,
    pub example_dialogue: Option<String>,
}

impl CharacterUpdate {
    pub fn is_empty(&self) -> bool {
        self.personality.is_none()
            && self.backstory.is_none()
            && self.appearance.is_none()
            && self.example_dialogue.is_none()
    }
}

impl Character {
    /// Validate raw input and build a character stamped with the current time.
    pub fn from_new(input: NewCharacter) -> Result<Self, ValidationError> {
        let name = validate_name(&input.name)?;
        let personality = validate_personality(&input.personality)?;
        let avatar = Some(avatar_for(&name).to_string());

        Ok(Self {
            name,
            personality,
            backstory: clean_optional(input.backstory.as_deref()),
            appearance: clean_optional(input.appearance.as_deref()),
            example_dialogue: clean_optional(input.example_dialogue.as_deref()),
            created: chrono::Utc::now().to_rfc3339(),
            avatar,
        })
    }

    /// Apply an edit in place. Validation runs before anything changes.
    pub fn apply_update(&mut self, update: &CharacterUpdate) -> Result<(), ValidationError> {
        let personality = update
            .personality
            .as_deref()
            .map(validate_personality)
            .transpose()?;

        if let Some(personality) = personality {
            self.personality = personality;
        }
        if let Some(ref backstory) = update.backstory {
            self.backstory = clean_optional(Some(backstory));
        }
        if let Some(ref appearance) = update.appearance {
            self.appearance = clean_optional(Some(appearance));
        }
        if let Some(ref dialogue) = update.example_dialogue {
            self.example_dialogue = clean_optional(Some(dialogue));
        }
        Ok(())
    }

    /// The avatar glyph, deriving it when the record predates avatars.
    pub fn avatar(&self) -> &str {
        self.avatar.as_deref().unwrap_or_else(|| avatar_for(&self.name))
    }
}

/// Validate a character name, returning the trimmed name.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let len = name.chars().count();
    if len < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort);
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if name.chars().any(|c| UNSAFE_NAME_CHARS.contains(&c)) {
        return Err(ValidationError::UnsafeNameCharacters);
    }

    Ok(name.to_string())
}

fn validate_personality(raw: &str) -> Result<String, ValidationError> {
    let personality = raw.trim();
    if personality.is_empty() {
        return Err(ValidationError::EmptyPersonality);
    }
    Ok(personality.to_string())
}

/// Deterministic avatar glyph for a name, keyed on its uppercased first letter.
pub fn avatar_for(name: &str) -> &'static str {
    let Some(first) = name.chars().next() else {
        return AVATARS[0];
    };
    let upper = first.to_uppercase().next().unwrap_or(first);
    let index = (upper as i64 - 65).rem_euclid(AVATARS.len() as i64);
    AVATARS[index as usize]
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Older records store absent fields as empty strings.
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}
