mod helpers;

use std::time::Duration;

use eliza::generation::{BackendStatus, GenerationError, GenerationParams};
use eliza::memory::{Extraction, Extractor};
use eliza::{EngineError, TurnOutcome};
use helpers::{ScriptedGenerator, create, failing_registry, params, test_registry, test_session};

#[tokio::test]
async fn turn_is_recorded_and_name_is_remembered() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let generator = ScriptedGenerator::new()
        .reply("  Nice to meet you, Alex!  ")
        .reply("Of course I remember.");

    let outcome = session
        .submit_turn("Nova", "Hi, my name is Alex", &generator, &params(), true)
        .await
        .unwrap();

    let TurnOutcome::Replied(turn) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(turn.user, "Hi, my name is Alex");
    assert_eq!(turn.reply, "Nice to meet you, Alex!");

    {
        let registry = session.registry();
        assert_eq!(registry.history("Nova").unwrap().len(), 1);
        let facts = &registry.memory("Nova").unwrap().user_facts;
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact, "User's name is Alex");
    }

    session
        .submit_turn("Nova", "Do you remember me?", &generator, &params(), true)
        .await
        .unwrap();

    let prompts = generator.prompts();
    let second = &prompts[1];
    assert!(second.contains("What you know about the user:\n- User's name is Alex"));
    assert!(second.contains(
        "Recent conversation:\nUser: Hi, my name is Alex\nNova: Nice to meet you, Alex!"
    ));
    assert!(second.ends_with("User: Do you remember me?\nNova:"));
}

#[tokio::test]
async fn missing_character_is_rejected() {
    let session = test_session(test_registry());
    let generator = ScriptedGenerator::new();

    let err = session
        .submit_turn("Ghost", "hello", &generator, &params(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CharacterNotFound(ref n) if n == "Ghost"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn unselected_character_asks_for_selection() {
    let session = test_session(test_registry());
    let err = session
        .submit_turn("", "hello", &ScriptedGenerator::new(), &params(), true)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Please select a character first.");
}

#[tokio::test]
async fn unavailable_backend_checked_first() {
    let session = test_session(test_registry());
    session.set_backend_status(BackendStatus::unavailable());

    let err = session
        .submit_turn("Ghost", "hello", &ScriptedGenerator::new(), &params(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BackendUnavailable));
}

#[tokio::test]
async fn blank_message_is_ignored() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let generator = ScriptedGenerator::new();

    let outcome = session
        .submit_turn("Nova", "   \n ", &generator, &params(), true)
        .await
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Ignored);
    assert_eq!(generator.calls(), 0);
    assert!(session.registry().history("Nova").unwrap().is_empty());
}

#[tokio::test]
async fn unserved_model_is_rejected() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let wanted = GenerationParams::new("mistral", 0.8, 200).unwrap();

    let err = session
        .submit_turn("Nova", "hello", &ScriptedGenerator::new(), &wanted, true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ModelNotAvailable(ref m) if m == "mistral"));
}

#[tokio::test]
async fn generation_failure_leaves_state_untouched() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let generator = ScriptedGenerator::new().fail(GenerationError::Timeout);

    let outcome = session
        .submit_turn("Nova", "my name is Alex", &generator, &params(), true)
        .await
        .unwrap();

    let view = outcome.view().unwrap();
    assert_eq!(view.user, "my name is Alex");
    assert_eq!(view.reply, "❌ ⏱️ AI timeout - model may be too large or busy");
    assert!(matches!(
        outcome,
        TurnOutcome::Failed { error: GenerationError::Timeout, .. }
    ));

    let registry = session.registry();
    assert!(registry.history("Nova").unwrap().is_empty());
    assert!(registry.memory("Nova").unwrap().is_empty());
}

#[tokio::test]
async fn slow_generation_times_out() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry).with_generation_timeout(Duration::from_millis(20));
    let generator = ScriptedGenerator::new().with_delay(Duration::from_secs(10));

    let outcome = session
        .submit_turn("Nova", "hello", &generator, &params(), true)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Failed { error: GenerationError::Timeout, .. }
    ));
    assert!(session.registry().history("Nova").unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_turn_changes_nothing_and_releases_character() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let slow = ScriptedGenerator::new().with_delay(Duration::from_secs(10));

    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        session.submit_turn("Nova", "my name is Alex", &slow, &params(), true),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(session.registry().history("Nova").unwrap().is_empty());
    assert!(session.registry().memory("Nova").unwrap().is_empty());

    let outcome = session
        .submit_turn("Nova", "hello again", &ScriptedGenerator::new(), &params(), true)
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Replied(_)));
}

#[tokio::test]
async fn second_turn_for_same_character_is_rejected_while_in_flight() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    create(&mut registry, "Sarah", "warm and witty");
    let session = test_session(registry);
    let slow = ScriptedGenerator::new().with_delay(Duration::from_millis(50));
    let fast = ScriptedGenerator::new();
    let params = params();

    let (first, second, other) = tokio::join!(
        session.submit_turn("Nova", "first", &slow, &params, true),
        session.submit_turn("Nova", "second", &fast, &params, true),
        session.submit_turn("Sarah", "hi", &fast, &params, true),
    );

    assert!(matches!(first.unwrap(), TurnOutcome::Replied(_)));
    assert!(matches!(second.unwrap_err(), EngineError::TurnInProgress(ref n) if n == "Nova"));
    assert!(matches!(other.unwrap(), TurnOutcome::Replied(_)));

    let registry = session.registry();
    let history = registry.history("Nova").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.last().unwrap().user, "first");
}

#[tokio::test]
async fn auto_memory_off_skips_extraction() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);

    session
        .submit_turn(
            "Nova",
            "my name is Alex and I like hiking",
            &ScriptedGenerator::new(),
            &params(),
            false,
        )
        .await
        .unwrap();

    let registry = session.registry();
    assert_eq!(registry.history("Nova").unwrap().len(), 1);
    assert!(registry.memory("Nova").unwrap().is_empty());
}

#[tokio::test]
async fn save_failure_after_generation_rolls_back() {
    let (mut registry, fail) = failing_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = session
        .submit_turn("Nova", "my name is Alex", &ScriptedGenerator::new(), &params(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));

    let registry = session.registry();
    assert!(registry.history("Nova").unwrap().is_empty());
    assert!(registry.memory("Nova").unwrap().is_empty());
}

#[tokio::test]
async fn empty_model_uses_first_discovered() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);

    let resolved = session
        .resolve_model(&GenerationParams::default())
        .unwrap();
    assert_eq!(resolved.model, "llama3.2");

    let outcome = session
        .submit_turn(
            "Nova",
            "hello",
            &ScriptedGenerator::new(),
            &GenerationParams::default(),
            true,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Replied(_)));
}

#[tokio::test]
async fn nova_learns_name_and_hobby_from_first_turn() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry);
    let generator = ScriptedGenerator::new().reply("\n  Hello Alex! Hiking sounds wonderful.  \n");

    let outcome = session
        .submit_turn(
            "Nova",
            "  Hi, my name is Alex and I like hiking.  ",
            &generator,
            &params(),
            true,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Replied(_)));

    let registry = session.registry();
    let history = registry.history("Nova").unwrap();
    assert_eq!(history.len(), 1);
    let turn = history.last().unwrap();
    assert_eq!(turn.user, "Hi, my name is Alex and I like hiking.");
    assert_eq!(turn.reply, "Hello Alex! Hiking sounds wonderful.");

    let memory = registry.memory("Nova").unwrap();
    let facts: Vec<&str> = memory.user_facts.iter().map(|f| f.fact.as_str()).collect();
    assert_eq!(facts, ["User's name is Alex"]);
    assert_eq!(memory.preferences.get("likes"), Some("hiking"));
}

struct TopicExtractor;

impl Extractor for TopicExtractor {
    fn extract(&self, user_message: &str, ai_response: &str) -> Vec<Extraction> {
        vec![
            Extraction::Topic(user_message.to_lowercase()),
            Extraction::Moment {
                text: ai_response.to_string(),
                tags: vec!["reply".into()],
            },
        ]
    }
}

#[tokio::test]
async fn custom_extractor_feeds_the_memory_bank() {
    let mut registry = test_registry();
    create(&mut registry, "Nova", "curious robot");
    let session = test_session(registry).with_extractor(Box::new(TopicExtractor));
    let generator = ScriptedGenerator::new().reply("Stars are far away.");

    session
        .submit_turn("Nova", "Astronomy", &generator, &params(), true)
        .await
        .unwrap();

    let registry = session.registry();
    let memory = registry.memory("Nova").unwrap();
    assert_eq!(memory.last_topics, ["astronomy"]);
    assert_eq!(memory.important_moments.len(), 1);
    assert_eq!(memory.important_moments[0].moment, "Stars are far away.");
    assert_eq!(memory.important_moments[0].tags, ["reply"]);
    // The heuristic extractor was replaced, not added to
    assert!(memory.user_facts.is_empty());
}
