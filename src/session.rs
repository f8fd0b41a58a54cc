//! Conversation turns.
//!
//! [`ConversationSession::submit_turn`] validates a turn, composes the prompt,
//! awaits the generator, and commits the result. Generation happens outside
//! the registry lock so other characters stay usable, but only one turn per
//! character may be in flight. History and memory change only after a
//! successful generation; a dropped future leaves them untouched.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::EngineError;
use crate::generation::{BackendDiscovery, BackendStatus, GenerationError, GenerationParams, Generator};
use crate::history::Turn;
use crate::memory::{Extractor, HeuristicExtractor};
use crate::prompt;
use crate::registry::CharacterRegistry;

/// Default upper bound on one generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// What happened to a submitted message.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The message was blank after trimming. Nothing happened.
    Ignored,
    /// The character replied; the turn is now in history.
    Replied(Turn),
    /// Generation failed. History and memory were not changed.
    Failed {
        user_message: String,
        error: GenerationError,
        /// Text to show in place of the reply.
        rendered: String,
    },
}

impl TurnOutcome {
    /// The turn as it should be displayed, with failures shown inline.
    pub fn view(&self) -> Option<Turn> {
        match self {
            Self::Ignored => None,
            Self::Replied(turn) => Some(turn.clone()),
            Self::Failed {
                user_message,
                rendered,
                ..
            } => Some(Turn::new(user_message.clone(), rendered.clone())),
        }
    }
}

pub struct ConversationSession {
    registry: Mutex<CharacterRegistry>,
    backend: Mutex<BackendStatus>,
    extractor: Box<dyn Extractor>,
    in_flight: Mutex<HashSet<String>>,
    generation_timeout: Duration,
}

impl ConversationSession {
    /// A session with the heuristic extractor and no backend known yet.
    pub fn new(registry: CharacterRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
            backend: Mutex::new(BackendStatus::unavailable()),
            extractor: Box::new(HeuristicExtractor),
            in_flight: Mutex::new(HashSet::new()),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Exclusive access to the registry for non-turn operations.
    pub fn registry(&self) -> MutexGuard<'_, CharacterRegistry> {
        lock(&self.registry)
    }

    pub fn into_registry(self) -> CharacterRegistry {
        self.registry
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn backend_status(&self) -> BackendStatus {
        lock(&self.backend).clone()
    }

    pub fn set_backend_status(&self, status: BackendStatus) {
        *lock(&self.backend) = status;
    }

    /// Ask `discovery` for the current backend state and remember it.
    pub async fn refresh_backend(&self, discovery: &dyn BackendDiscovery) -> BackendStatus {
        let status = discovery.discover().await;
        self.set_backend_status(status.clone());
        status
    }

    /// Fill in the model when unset and check it is one the backend serves.
    pub fn resolve_model(&self, params: &GenerationParams) -> Result<GenerationParams, EngineError> {
        resolve_model(&self.backend_status(), params)
    }

    /// Run one conversational turn for `character_name`.
    ///
    /// Preconditions are checked in order (backend, character, message, model,
    /// in-flight) and fail without changing any state. A blank message yields
    /// [`TurnOutcome::Ignored`]. Generation failures are reported as
    /// [`TurnOutcome::Failed`] and are not persisted.
    pub async fn submit_turn(
        &self,
        character_name: &str,
        user_message: &str,
        generator: &dyn Generator,
        params: &GenerationParams,
        auto_memory: bool,
    ) -> Result<TurnOutcome, EngineError> {
        let backend = self.backend_status();
        if !backend.available {
            return Err(EngineError::BackendUnavailable);
        }

        let user_message = user_message.trim();
        let (prompt, params, _guard) = {
            let registry = self.registry();
            let entry = registry
                .entry(character_name)
                .ok_or_else(|| EngineError::CharacterNotFound(character_name.to_string()))?;
            if user_message.is_empty() {
                return Ok(TurnOutcome::Ignored);
            }
            let params = resolve_model(&backend, params)?;
            let guard = InFlightGuard::acquire(&self.in_flight, character_name)?;
            let prompt = prompt::compose(
                &entry.character,
                &entry.memory,
                &entry.history,
                user_message,
            );
            (prompt, params, guard)
        };

        tracing::info!(character = %character_name, model = %params.model, "generating reply");
        let generated =
            match tokio::time::timeout(self.generation_timeout, generator.generate(&prompt, &params))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout),
            };

        let reply = match generated {
            Ok(text) => text.trim().to_string(),
            Err(error) => {
                tracing::warn!(character = %character_name, error = %error, "generation failed");
                return Ok(TurnOutcome::Failed {
                    user_message: user_message.to_string(),
                    rendered: error.render(),
                    error,
                });
            }
        };

        let extractions = if auto_memory {
            self.extractor.extract(user_message, &reply)
        } else {
            Vec::new()
        };

        let turn = Turn::new(user_message, reply);
        self.registry()
            .commit_turn(character_name, turn.clone(), extractions)?;
        tracing::debug!(character = %character_name, "turn committed");
        Ok(TurnOutcome::Replied(turn))
    }
}

fn resolve_model(
    backend: &BackendStatus,
    params: &GenerationParams,
) -> Result<GenerationParams, EngineError> {
    let mut params = params.clone();
    if params.model.is_empty() {
        params.model = backend
            .models
            .first()
            .cloned()
            .ok_or(EngineError::BackendUnavailable)?;
    } else if !backend.models.is_empty() && !backend.serves(&params.model) {
        return Err(EngineError::ModelNotAvailable(params.model));
    }
    Ok(params)
}

/// Marks a character as having a turn in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    name: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, name: &str) -> Result<Self, EngineError> {
        if !lock(set).insert(name.to_string()) {
            return Err(EngineError::TurnInProgress(name.to_string()));
        }
        Ok(Self {
            set,
            name: name.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.name);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(models: &[&str]) -> BackendStatus {
        BackendStatus::available(models.iter().map(|m| m.to_string()).collect())
    }

    #[test]
    fn empty_model_resolves_to_first_served() {
        let params = resolve_model(&status(&["llama3.2", "mistral"]), &GenerationParams::default())
            .unwrap();
        assert_eq!(params.model, "llama3.2");
    }

    #[test]
    fn unknown_model_rejected() {
        let params = GenerationParams {
            model: "gpt-9".into(),
            ..GenerationParams::default()
        };
        assert!(matches!(
            resolve_model(&status(&["llama3.2"]), &params),
            Err(EngineError::ModelNotAvailable(m)) if m == "gpt-9"
        ));
    }

    #[test]
    fn explicit_model_allowed_when_list_unknown() {
        let params = GenerationParams {
            model: "custom".into(),
            ..GenerationParams::default()
        };
        assert_eq!(resolve_model(&status(&[]), &params).unwrap().model, "custom");
    }

    #[test]
    fn empty_model_with_no_models_is_unavailable() {
        assert!(matches!(
            resolve_model(&status(&[]), &GenerationParams::default()),
            Err(EngineError::BackendUnavailable)
        ));
    }

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let set = Mutex::new(HashSet::new());
        let guard = InFlightGuard::acquire(&set, "Nova").unwrap();
        assert!(matches!(
            InFlightGuard::acquire(&set, "Nova"),
            Err(EngineError::TurnInProgress(_))
        ));
        assert!(InFlightGuard::acquire(&set, "Sarah").is_ok());
        drop(guard);
        assert!(InFlightGuard::acquire(&set, "Nova").is_ok());
    }
}
