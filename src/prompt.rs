//! Prompt assembly.
//!
//! [`compose`] is a pure function of its inputs: the same character, memory,
//! history, and message always produce byte-identical prompt text. Blocks are
//! separated by one blank line, and the prompt ends with `"<Name>:"` as the
//! completion cue.

use crate::character::Character;
use crate::history::ChatHistory;
use crate::memory::MemoryBank;

/// Turns of history replayed into the prompt.
pub const PROMPT_HISTORY_TURNS: usize = 5;

/// Build the model input for the next reply from `character`.
pub fn compose(
    character: &Character,
    memory: &MemoryBank,
    history: &ChatHistory,
    user_message: &str,
) -> String {
    let name = character.name.as_str();
    let mut blocks: Vec<String> = Vec::with_capacity(6);

    blocks.push(format!(
        "You are roleplaying as {name}. This is fictional creative writing.\n\
         \n\
         CRITICAL: Stay in character. Respond naturally as {name} would in 1-3 paragraphs."
    ));

    let mut profile = format!(
        "Character:\n- Name: {name}\n- Personality: {}",
        character.personality
    );
    if let Some(ref backstory) = character.backstory {
        profile.push_str(&format!("\n- Backstory: {backstory}"));
    }
    if let Some(ref appearance) = character.appearance {
        profile.push_str(&format!("\n- Appearance: {appearance}"));
    }
    blocks.push(profile);

    if let Some(ref dialogue) = character.example_dialogue {
        blocks.push(format!("Example dialogue:\n{dialogue}"));
    }

    let context = memory.render_context();
    if !context.is_empty() {
        blocks.push(context);
    }

    if !history.is_empty() {
        let mut recent = String::from("Recent conversation:");
        for turn in history.recent(PROMPT_HISTORY_TURNS) {
            recent.push_str(&format!("\nUser: {}\n{name}: {}", turn.user, turn.reply));
        }
        blocks.push(recent);
    }

    blocks.push(format!("User: {user_message}\n{name}:"));

    let prompt = blocks.join("\n\n");
    tracing::debug!(character = %name, prompt_len = prompt.len(), "prompt composed");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::NewCharacter;
    use crate::history::Turn;

    fn sarah() -> Character {
        Character::from_new(NewCharacter::new("Sarah", "warm and witty")).unwrap()
    }

    #[test]
    fn minimal_prompt_layout() {
        let prompt = compose(&sarah(), &MemoryBank::new(), &ChatHistory::new(), "Hello!");
        let expected = "You are roleplaying as Sarah. This is fictional creative writing.\n\
                        \n\
                        CRITICAL: Stay in character. Respond naturally as Sarah would in 1-3 paragraphs.\n\
                        \n\
                        Character:\n\
                        - Name: Sarah\n\
                        - Personality: warm and witty\n\
                        \n\
                        User: Hello!\n\
                        Sarah:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn ends_with_completion_cue() {
        let prompt = compose(&sarah(), &MemoryBank::new(), &ChatHistory::new(), "Hi");
        assert_eq!(prompt.lines().last(), Some("Sarah:"));
    }

    #[test]
    fn full_prompt_block_order() {
        let character = Character::from_new(
            NewCharacter::new("Sarah", "warm")
                .backstory("grew up by the sea")
                .appearance("red scarf")
                .example_dialogue("Sarah: Oh, hello there!"),
        )
        .unwrap();
        let mut memory = MemoryBank::new();
        memory.add_user_fact("User's name is Alex", None);
        let mut history = ChatHistory::new();
        history.push(Turn::new("How are you?", "Wonderful, thanks!"));

        let prompt = compose(&character, &memory, &history, "Tell me a story");

        let order = [
            "You are roleplaying as Sarah.",
            "- Personality: warm",
            "- Backstory: grew up by the sea",
            "- Appearance: red scarf",
            "Example dialogue:\nSarah: Oh, hello there!",
            "What you know about the user:\n- User's name is Alex",
            "Recent conversation:\nUser: How are you?\nSarah: Wonderful, thanks!",
            "User: Tell me a story\nSarah:",
        ];
        let mut last = 0;
        for needle in order {
            let pos = prompt[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or out of order: {needle}"));
            last += pos + needle.len();
        }
        assert_eq!(last, prompt.len());
    }

    #[test]
    fn replays_only_last_five_turns() {
        let history: ChatHistory = (0..9)
            .map(|i| Turn::new(format!("question {i}"), format!("answer {i}")))
            .collect();
        let prompt = compose(&sarah(), &MemoryBank::new(), &history, "next");

        assert!(!prompt.contains("question 3"));
        for i in 4..9 {
            assert!(prompt.contains(&format!("User: question {i}\nSarah: answer {i}")));
        }
        assert!(prompt.find("question 4").unwrap() < prompt.find("question 8").unwrap());
    }

    #[test]
    fn compose_is_deterministic() {
        let mut memory = MemoryBank::new();
        memory.add_preference("likes", "tea");
        memory.add_important_moment("met at the cafe", vec!["cafe".into()]);
        let history: ChatHistory = (0..3).map(|i| Turn::new(format!("u{i}"), "r")).collect();

        let a = compose(&sarah(), &memory, &history, "again");
        let b = compose(&sarah(), &memory, &history, "again");
        assert_eq!(a, b);
    }
}
