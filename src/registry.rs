//! Character registry.
//!
//! Owns every character together with its chat history and memory bank,
//! keyed by name, so the three always exist or disappear together. Each
//! mutating operation persists through the [`CharacterStore`] and restores
//! the previous in-memory state if the save fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::character::{Character, CharacterUpdate, NewCharacter};
use crate::error::{EngineError, ValidationError};
use crate::history::{ChatHistory, Turn};
use crate::memory::{Extraction, MemoryBank};
use crate::store::{CharacterStore, DeleteReport, StoreError};

/// Export format identifier.
pub const EXPORT_FORMAT: &str = "eliza_character_v1";

/// A character with the records that share its name.
#[derive(Debug, Clone)]
pub struct CharacterEntry {
    pub character: Character,
    pub history: ChatHistory,
    pub memory: MemoryBank,
}

/// Portable character card. Carries the definition only, not history or memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterExport {
    pub format: String,
    pub version: String,
    pub character: Character,
    pub exported: String,
    #[serde(default)]
    pub note: String,
}

/// Memory counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharacterStats {
    pub facts: usize,
    pub moments: usize,
    pub preferences: usize,
    pub turns: usize,
}

pub struct CharacterRegistry {
    store: Box<dyn CharacterStore>,
    entries: BTreeMap<String, CharacterEntry>,
}

impl CharacterRegistry {
    /// Load every persisted character from `store`.
    pub fn open(store: Box<dyn CharacterStore>) -> Result<Self, StoreError> {
        let entries = store
            .load_all()?
            .into_iter()
            .map(|stored| {
                (
                    stored.character.name.clone(),
                    CharacterEntry {
                        character: stored.character,
                        history: stored.history,
                        memory: stored.memory,
                    },
                )
            })
            .collect();
        Ok(Self { store, entries })
    }

    /// Validate, register, and persist a new character with empty history
    /// and memory.
    pub fn create(&mut self, input: NewCharacter) -> Result<&Character, EngineError> {
        let character = Character::from_new(input)?;
        let name = character.name.clone();
        if self.entries.contains_key(&name) {
            return Err(EngineError::DuplicateName(name));
        }

        let entry = CharacterEntry {
            character,
            history: ChatHistory::new(),
            memory: MemoryBank::new(),
        };
        if let Err(e) = self
            .store
            .save(&entry.character, &entry.history, &entry.memory)
        {
            tracing::warn!(character = %name, error = %e, "create rolled back");
            return Err(e.into());
        }

        tracing::info!(character = %name, "character created");
        let entry = self.entries.entry(name).or_insert(entry);
        Ok(&entry.character)
    }

    /// Remove a character with its history and memory. Store failures on
    /// individual records are tolerated and reflected in the report.
    pub fn delete(&mut self, name: &str) -> Result<DeleteReport, EngineError> {
        if self.entries.remove(name).is_none() {
            return Err(EngineError::CharacterNotFound(name.to_string()));
        }

        let report = self.store.delete(name).unwrap_or_else(|e| {
            tracing::warn!(character = %name, error = %e, "store delete failed");
            DeleteReport::default()
        });
        tracing::info!(character = %name, ?report, "character deleted");
        Ok(report)
    }

    /// Character names in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        self.entries.get(name).map(|e| &e.character)
    }

    pub fn entry(&self, name: &str) -> Option<&CharacterEntry> {
        self.entries.get(name)
    }

    pub fn history(&self, name: &str) -> Option<&ChatHistory> {
        self.entries.get(name).map(|e| &e.history)
    }

    pub fn memory(&self, name: &str) -> Option<&MemoryBank> {
        self.entries.get(name).map(|e| &e.memory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self, name: &str) -> Option<CharacterStats> {
        self.entries.get(name).map(|e| CharacterStats {
            facts: e.memory.user_facts.len(),
            moments: e.memory.important_moments.len(),
            preferences: e.memory.preferences.len(),
            turns: e.history.len(),
        })
    }

    /// Explicit edit of a character's profile. The name is immutable.
    pub fn edit(&mut self, name: &str, update: CharacterUpdate) -> Result<&Character, EngineError> {
        self.mutate(name, |entry| {
            entry.character.apply_update(&update)?;
            Ok(())
        })?;
        tracing::info!(character = %name, "character edited");
        self.get(name)
            .ok_or_else(|| EngineError::CharacterNotFound(name.to_string()))
    }

    /// Add a fact by hand. Returns `false` if an equal fact was already known.
    pub fn add_fact(&mut self, name: &str, fact: &str) -> Result<bool, EngineError> {
        let fact = fact.trim();
        if fact.is_empty() {
            return Err(ValidationError::EmptyFact.into());
        }
        self.mutate(name, |entry| Ok(entry.memory.add_user_fact(fact, None)))
    }

    /// Tag a moment. `tags_csv` is split on commas; blank tags are dropped.
    pub fn tag_moment(&mut self, name: &str, moment: &str, tags_csv: &str) -> Result<(), EngineError> {
        let moment = moment.trim();
        if moment.is_empty() {
            return Err(ValidationError::EmptyMoment.into());
        }
        let tags = split_tags(tags_csv);
        self.mutate(name, |entry| {
            entry.memory.add_important_moment(moment, tags);
            Ok(())
        })
    }

    /// Reset a character's memory bank to empty.
    pub fn clear_memory(&mut self, name: &str) -> Result<(), EngineError> {
        self.mutate(name, |entry| {
            entry.memory = MemoryBank::new();
            Ok(())
        })?;
        tracing::info!(character = %name, "memory cleared");
        Ok(())
    }

    pub fn clear_history(&mut self, name: &str) -> Result<(), EngineError> {
        self.mutate(name, |entry| {
            entry.history.clear();
            Ok(())
        })?;
        tracing::info!(character = %name, "history cleared");
        Ok(())
    }

    /// Record a completed turn: append to history, apply extracted memories,
    /// and persist all of it together.
    pub fn commit_turn(
        &mut self,
        name: &str,
        turn: Turn,
        extractions: Vec<Extraction>,
    ) -> Result<(), EngineError> {
        self.mutate(name, |entry| {
            entry.history.push(turn);
            entry.memory.apply(extractions);
            Ok(())
        })
    }

    pub fn export(&self, name: &str) -> Result<CharacterExport, EngineError> {
        let character = self
            .get(name)
            .ok_or_else(|| EngineError::CharacterNotFound(name.to_string()))?;
        Ok(CharacterExport {
            format: EXPORT_FORMAT.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            character: character.clone(),
            exported: chrono::Utc::now().to_rfc3339(),
            note: "Chat history and memories not included.".to_string(),
        })
    }

    /// Create a character from an exported card. Validation and duplicate
    /// checks apply as for [`CharacterRegistry::create`].
    pub fn import(&mut self, card: CharacterExport) -> Result<&Character, EngineError> {
        let c = card.character;
        self.create(NewCharacter {
            name: c.name,
            personality: c.personality,
            backstory: c.backstory,
            appearance: c.appearance,
            example_dialogue: c.example_dialogue,
        })
    }

    /// Apply `f` to an entry and persist it, restoring the previous state if
    /// either `f` or the save fails.
    fn mutate<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut CharacterEntry) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| EngineError::CharacterNotFound(name.to_string()))?;
        let snapshot = entry.clone();

        let result = f(&mut *entry).and_then(|value| {
            self.store
                .save(&entry.character, &entry.history, &entry.memory)
                .map(|()| value)
                .map_err(EngineError::from)
        });

        if result.is_err() {
            tracing::warn!(character = %name, "change rolled back");
            *entry = snapshot;
        }
        result
    }
}

fn split_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
