//! Per-character chat transcript, bounded to the most recent turns.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of turns kept per character. Older turns are dropped first.
pub const MAX_HISTORY_TURNS: usize = 100;

/// One user message and the character's reply.
///
/// Persisted as a 2-element `[user, reply]` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Turn {
    pub user: String,
    pub reply: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            reply: reply.into(),
        }
    }
}

impl From<(String, String)> for Turn {
    fn from((user, reply): (String, String)) -> Self {
        Self { user, reply }
    }
}

impl From<Turn> for (String, String) {
    fn from(turn: Turn) -> Self {
        (turn.user, turn.reply)
    }
}

/// Ordered transcript, oldest turn first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Turn>", into = "Vec<Turn>")]
pub struct ChatHistory {
    turns: VecDeque<Turn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, evicting the oldest turns beyond [`MAX_HISTORY_TURNS`].
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        self.truncate();
    }

    /// The last `n` turns in chronological order.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    fn truncate(&mut self) {
        while self.turns.len() > MAX_HISTORY_TURNS {
            self.turns.pop_front();
        }
    }
}

impl FromIterator<Turn> for ChatHistory {
    /// Collect turns, keeping only the most recent [`MAX_HISTORY_TURNS`].
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        let mut history = Self {
            turns: iter.into_iter().collect(),
        };
        history.truncate();
        history
    }
}

impl From<Vec<Turn>> for ChatHistory {
    fn from(turns: Vec<Turn>) -> Self {
        turns.into_iter().collect()
    }
}

impl From<ChatHistory> for Vec<Turn> {
    fn from(history: ChatHistory) -> Self {
        history.turns.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_first() {
        let mut history = ChatHistory::new();
        for i in 0..150 {
            history.push(Turn::new(format!("u{i}"), format!("r{i}")));
        }
        assert_eq!(history.len(), MAX_HISTORY_TURNS);
        assert_eq!(history.iter().next().unwrap().user, "u50");
        assert_eq!(history.last().unwrap().user, "u149");
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let history: ChatHistory = (0..8).map(|i| Turn::new(format!("u{i}"), "r")).collect();
        let users: Vec<&str> = history.recent(5).map(|t| t.user.as_str()).collect();
        assert_eq!(users, ["u3", "u4", "u5", "u6", "u7"]);

        let short: ChatHistory = (0..2).map(|i| Turn::new(format!("u{i}"), "r")).collect();
        assert_eq!(short.recent(5).count(), 2);
    }

    #[test]
    fn serializes_as_pairs() {
        let mut history = ChatHistory::new();
        history.push(Turn::new("hello", "hi there"));
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"[["hello","hi there"]]"#);

        let back: ChatHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn oversized_record_is_trimmed_on_load() {
        let turns: Vec<Turn> = (0..120).map(|i| Turn::new(format!("u{i}"), "r")).collect();
        let json = serde_json::to_string(&turns).unwrap();
        let history: ChatHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), MAX_HISTORY_TURNS);
        assert_eq!(history.iter().next().unwrap().user, "u20");
    }
}
