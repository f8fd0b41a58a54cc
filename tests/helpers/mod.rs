#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eliza::character::Character;
use eliza::generation::{BackendStatus, GenerationError, GenerationParams, Generator};
use eliza::store::{CharacterStore, DeleteReport, SqliteStore, StoreError, StoredCharacter};
use eliza::{CharacterRegistry, ChatHistory, ConversationSession, MemoryBank, NewCharacter};

/// A registry over a fresh in-memory database.
pub fn test_registry() -> CharacterRegistry {
    let conn = eliza::db::open_memory_database().unwrap();
    CharacterRegistry::open(Box::new(SqliteStore::new(conn))).unwrap()
}

/// A registry whose store starts failing once the returned flag is set.
pub fn failing_registry() -> (CharacterRegistry, Arc<AtomicBool>) {
    let (store, fail) = FailingStore::new();
    (CharacterRegistry::open(Box::new(store)).unwrap(), fail)
}

pub fn create(registry: &mut CharacterRegistry, name: &str, personality: &str) {
    registry
        .create(NewCharacter::new(name, personality))
        .unwrap();
}

/// A session with a reachable backend serving `llama3.2`.
pub fn test_session(registry: CharacterRegistry) -> ConversationSession {
    let session = ConversationSession::new(registry);
    session.set_backend_status(BackendStatus::available(vec!["llama3.2".into()]));
    session
}

pub fn params() -> GenerationParams {
    GenerationParams::new("llama3.2", 0.8, 200).unwrap()
}

/// Generator that plays back queued results and records every prompt.
/// Once the queue is empty it echoes "ok".
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn fail(self, error: GenerationError) -> Self {
        self.push(Err(error))
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, result: Result<String, GenerationError>) -> Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// In-memory SQLite store whose writes fail while the flag is set.
pub struct FailingStore {
    inner: SqliteStore,
    fail: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner: SqliteStore::new(eliza::db::open_memory_database().unwrap()),
            fail: Arc::clone(&fail),
        };
        (store, fail)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

impl CharacterStore for FailingStore {
    fn load_all(&self) -> Result<Vec<StoredCharacter>, StoreError> {
        self.inner.load_all()
    }

    fn save(
        &mut self,
        character: &Character,
        history: &ChatHistory,
        memory: &MemoryBank,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner.save(character, history, memory)
    }

    fn delete(&mut self, name: &str) -> Result<DeleteReport, StoreError> {
        self.check()?;
        self.inner.delete(name)
    }
}
