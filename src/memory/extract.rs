//! Memory extraction from chat turns.
//!
//! An [`Extractor`] turns one turn into a list of [`Extraction`]s, which the
//! bank applies with its `add_*` operations. [`HeuristicExtractor`] is the
//! built-in pattern matcher. It only reads the user's message.

use std::sync::LazyLock;

use regex::Regex;

use super::bank::capitalize;

/// One piece of knowledge mined from a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fact(String),
    Preference { category: String, value: String },
    Moment { text: String, tags: Vec<String> },
    Topic(String),
}

/// Pluggable source of memories. Must never fail: unmatched input yields an
/// empty list.
pub trait Extractor: Send + Sync {
    fn extract(&self, user_message: &str, ai_response: &str) -> Vec<Extraction>;
}

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmy name is (\w+)").expect("NAME_RE regex should compile"));

/// "i am a ROLE", "i work as a ROLE", "i am from PLACE". Captures 1–2 words.
static IDENTITY_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\bi(?:'m| am) a (\w+(?:\s+\w+)?)").expect("role regex should compile"),
        Regex::new(r"\bi work as (?:a |an )?(\w+(?:\s+\w+)?)")
            .expect("work regex should compile"),
        Regex::new(r"\bi(?:'m| am) from (\w+(?:\s+\w+)?)").expect("origin regex should compile"),
    ]
});

/// "i like/love/enjoy/prefer THING". Captures 1–4 words.
static PREFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bi (?:like|love|enjoy|prefer) (\w+(?:\s+\w+){0,3})")
        .expect("PREFERENCE_RE regex should compile")
});

/// Regex heuristics for names, roles, origins, and likes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl Extractor for HeuristicExtractor {
    fn extract(&self, user_message: &str, _ai_response: &str) -> Vec<Extraction> {
        let message = user_message.to_lowercase();
        let mut found = Vec::new();

        if let Some(caps) = NAME_RE.captures(&message) {
            found.push(Extraction::Fact(format!(
                "User's name is {}",
                capitalize(&caps[1])
            )));
        }

        for re in IDENTITY_RES.iter() {
            if let Some(caps) = re.captures(&message) {
                found.push(Extraction::Fact(format!("User is {}", &caps[1])));
            }
        }

        if let Some(caps) = PREFERENCE_RE.captures(&message) {
            found.push(Extraction::Preference {
                category: "likes".to_string(),
                value: caps[1].to_string(),
            });
        }

        tracing::debug!(count = found.len(), "heuristic extraction");
        found
    }
}
