//! Memory record types.
//!
//! Defines [`UserFact`] (a learned fact about the user), [`ImportantMoment`]
//! (a tagged moment), [`Confidence`], and [`Preferences`] (an insertion-ordered
//! category → value map).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How sure the extractor was about a fact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fact about the user, e.g. `"User's name is Alex"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFact {
    pub fact: String,
    /// ISO 8601 timestamp of when the fact was learned.
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Confidence,
}

/// A moment the user asked the character to remember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportantMoment {
    pub moment: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl ImportantMoment {
    /// Tags joined for display, or `"general"` when untagged.
    pub fn tag_label(&self) -> String {
        if self.tags.is_empty() {
            "general".to_string()
        } else {
            self.tags.join(", ")
        }
    }
}

/// Category → value map that keeps insertion order. Re-inserting a category
/// overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    entries: Vec<(String, String)>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins per category.
    pub fn insert(&mut self, category: impl Into<String>, value: impl Into<String>) {
        let category = category.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((category, value)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Preferences {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, value) in &self.entries {
            map.serialize_entry(category, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Preferences {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PreferencesVisitor;

        impl<'de> Visitor<'de> for PreferencesVisitor {
            type Value = Preferences;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of preference category to value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut prefs = Preferences::new();
                while let Some((category, value)) = access.next_entry::<String, String>()? {
                    prefs.insert(category, value);
                }
                Ok(prefs)
            }
        }

        deserializer.deserialize_map(PreferencesVisitor)
    }
}
