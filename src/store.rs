//! Persistence store for characters, transcripts, and memory banks.
//!
//! [`CharacterStore`] is the contract the registry persists through;
//! [`SqliteStore`] implements it over the schema in [`crate::db::schema`].
//! A character's three records are saved in one transaction so a reader never
//! sees a character whose history and memory are out of step with it.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::character::Character;
use crate::history::ChatHistory;
use crate::memory::MemoryBank;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record for '{name}': {reason}")]
    CorruptRecord { name: String, reason: String },
}

/// A character and its records as read back from the store.
#[derive(Debug, Clone)]
pub struct StoredCharacter {
    pub character: Character,
    pub history: ChatHistory,
    pub memory: MemoryBank,
}

/// Which records a delete actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub character: bool,
    pub history: bool,
    pub memory: bool,
}

/// Durable storage keyed by character name.
pub trait CharacterStore: Send {
    /// Every readable character with its history and memory.
    fn load_all(&self) -> Result<Vec<StoredCharacter>, StoreError>;

    /// Write all three records as one atomic unit.
    fn save(
        &mut self,
        character: &Character,
        history: &ChatHistory,
        memory: &MemoryBank,
    ) -> Result<(), StoreError>;

    /// Remove each record independently. A missing or failing record does not
    /// stop the others from being removed.
    fn delete(&mut self, name: &str) -> Result<DeleteReport, StoreError>;
}

/// SQLite-backed [`CharacterStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wrap a connection whose schema is already initialized
    /// (see [`crate::db::open_database`]).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn load_history(&self, name: &str) -> Result<ChatHistory, StoreError> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM chat_histories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match doc {
            None => Ok(ChatHistory::new()),
            Some(doc) => serde_json::from_str(&doc).map_err(|e| StoreError::CorruptRecord {
                name: name.to_string(),
                reason: format!("history: {e}"),
            }),
        }
    }

    fn load_memory(&self, name: &str) -> Result<MemoryBank, StoreError> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM memory_banks WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        let Some(doc) = doc else {
            return Ok(MemoryBank::new());
        };
        let corrupt = |e: serde_json::Error| StoreError::CorruptRecord {
            name: name.to_string(),
            reason: format!("memory: {e}"),
        };
        let record: serde_json::Value = serde_json::from_str(&doc).map_err(corrupt)?;
        MemoryBank::from_record(record).map_err(corrupt)
    }

    fn delete_row(&self, table: &str, name: &str) -> bool {
        match self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE name = ?1"), params![name])
        {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(table, character = %name, error = %e, "failed to delete record");
                false
            }
        }
    }
}

impl CharacterStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<StoredCharacter>, StoreError> {
        let rows: Vec<(String, String)> = self
            .conn
            .prepare("SELECT name, document FROM characters ORDER BY name")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut loaded = Vec::with_capacity(rows.len());
        for (name, document) in rows {
            let character: Character = match serde_json::from_str(&document) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(character = %name, error = %e, "skipping corrupt character record");
                    continue;
                }
            };

            let history = self.load_history(&name).unwrap_or_else(|e| {
                tracing::warn!(character = %name, error = %e, "history unreadable, starting empty");
                ChatHistory::new()
            });
            let memory = self.load_memory(&name).unwrap_or_else(|e| {
                tracing::warn!(character = %name, error = %e, "memory unreadable, starting empty");
                MemoryBank::new()
            });

            loaded.push(StoredCharacter {
                character,
                history,
                memory,
            });
        }

        tracing::info!(count = loaded.len(), "characters loaded");
        Ok(loaded)
    }

    fn save(
        &mut self,
        character: &Character,
        history: &ChatHistory,
        memory: &MemoryBank,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let character_doc = serde_json::to_string(character)?;
        let history_doc = serde_json::to_string(history)?;
        let memory_doc = serde_json::to_string(&memory.to_record())?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO characters (name, document, created_at, updated_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            params![character.name, character_doc, character.created, now],
        )?;
        tx.execute(
            "INSERT INTO chat_histories (name, document, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            params![character.name, history_doc, now],
        )?;
        tx.execute(
            "INSERT INTO memory_banks (name, document, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            params![character.name, memory_doc, now],
        )?;
        tx.commit()?;

        tracing::debug!(character = %character.name, turns = history.len(), "character saved");
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<DeleteReport, StoreError> {
        let report = DeleteReport {
            character: self.delete_row("characters", name),
            history: self.delete_row("chat_histories", name),
            memory: self.delete_row("memory_banks", name),
        };
        tracing::debug!(character = %name, ?report, "character records deleted");
        Ok(report)
    }
}
