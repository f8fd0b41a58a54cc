//! Per-character memory bank.
//!
//! Facts are deduplicated case-insensitively, preferences are last-write-wins,
//! moments grow without bound, and topics are a sliding window. The bank
//! renders itself into the memory block of a prompt via
//! [`MemoryBank::render_context`].

use serde::{Deserialize, Serialize};

use super::extract::{Extraction, Extractor, HeuristicExtractor};
use super::types::{Confidence, ImportantMoment, Preferences, UserFact};

/// Most recent facts surfaced in a prompt.
pub const CONTEXT_FACTS: usize = 10;

/// Most recent moments surfaced in a prompt.
pub const CONTEXT_MOMENTS: usize = 5;

/// Topics kept in the sliding window.
pub const MAX_TOPICS: usize = 10;

/// Structured long-term knowledge about the user, owned by one character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryBank {
    pub user_facts: Vec<UserFact>,
    pub important_moments: Vec<ImportantMoment>,
    /// Reserved for conversation summarization; nothing writes it yet.
    pub conversation_summaries: Vec<String>,
    pub preferences: Preferences,
    pub last_topics: Vec<String>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact unless one equal under case-insensitive comparison exists.
    /// Returns `true` if the fact was added.
    pub fn add_user_fact(&mut self, fact: &str, timestamp: Option<&str>) -> bool {
        let needle = fact.to_lowercase();
        if self
            .user_facts
            .iter()
            .any(|f| f.fact.to_lowercase() == needle)
        {
            return false;
        }

        self.user_facts.push(UserFact {
            fact: fact.to_string(),
            timestamp: timestamp.map_or_else(now, str::to_string),
            confidence: Confidence::High,
        });
        true
    }

    pub fn add_important_moment(&mut self, moment: &str, tags: Vec<String>) {
        self.important_moments.push(ImportantMoment {
            moment: moment.to_string(),
            tags,
            timestamp: now(),
        });
    }

    pub fn add_preference(&mut self, category: &str, value: &str) {
        self.preferences.insert(category, value);
    }

    /// Append a topic if not already present, keeping the last [`MAX_TOPICS`].
    pub fn add_topic(&mut self, topic: &str) {
        if self.last_topics.iter().any(|t| t == topic) {
            return;
        }
        self.last_topics.push(topic.to_string());
        if self.last_topics.len() > MAX_TOPICS {
            let excess = self.last_topics.len() - MAX_TOPICS;
            self.last_topics.drain(..excess);
        }
    }

    /// Route extracted items to the matching `add_*` operation.
    pub fn apply(&mut self, extractions: Vec<Extraction>) {
        for extraction in extractions {
            match extraction {
                Extraction::Fact(fact) => {
                    self.add_user_fact(&fact, None);
                }
                Extraction::Preference { category, value } => {
                    self.add_preference(&category, &value);
                }
                Extraction::Moment { text, tags } => self.add_important_moment(&text, tags),
                Extraction::Topic(topic) => self.add_topic(&topic),
            }
        }
    }

    /// Mine the user's message with the built-in heuristic extractor.
    pub fn extract_from_turn(&mut self, user_message: &str, ai_response: &str) {
        let extractions = HeuristicExtractor.extract(user_message, ai_response);
        self.apply(extractions);
    }

    /// Memory block for prompt inclusion. Empty sections are omitted; an empty
    /// bank renders as an empty string.
    pub fn render_context(&self) -> String {
        let mut sections = Vec::new();

        if !self.user_facts.is_empty() {
            let mut section = String::from("What you know about the user:");
            for fact in tail(&self.user_facts, CONTEXT_FACTS) {
                section.push_str("\n- ");
                section.push_str(&fact.fact);
            }
            sections.push(section);
        }

        if !self.preferences.is_empty() {
            let mut section = String::from("User preferences:");
            for (category, value) in self.preferences.iter() {
                section.push_str(&format!("\n- {}: {}", capitalize(category), value));
            }
            sections.push(section);
        }

        if !self.important_moments.is_empty() {
            let mut section = String::from("Important moments you remember:");
            for moment in tail(&self.important_moments, CONTEXT_MOMENTS) {
                section.push_str(&format!("\n- [{}] {}", moment.tag_label(), moment.moment));
            }
            sections.push(section);
        }

        sections.join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.user_facts.is_empty()
            && self.important_moments.is_empty()
            && self.conversation_summaries.is_empty()
            && self.preferences.is_empty()
            && self.last_topics.is_empty()
    }

    pub fn to_record(&self) -> serde_json::Value {
        // A struct of strings, vecs, and string maps always serializes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuild from a record. Absent fields default to empty containers.
    pub fn from_record(record: serde_json::Value) -> Result<Self, serde_json::Error> {
        if record.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(record)
    }
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
