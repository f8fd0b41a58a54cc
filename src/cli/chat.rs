//! CLI `chat` command: a line-oriented conversation with one character.

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use eliza::config::ElizaConfig;
use eliza::generation::GenerationParams;
use eliza::{ConversationSession, EngineError, TurnOutcome};

/// Overrides from the command line. `None` falls back to config.
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub auto_memory: bool,
}

pub async fn chat(config: &ElizaConfig, name: &str, options: ChatOptions) -> Result<()> {
    let registry = super::open_registry(config)?;
    let Some(avatar) = registry.get(name).map(|c| c.avatar().to_string()) else {
        return Err(EngineError::CharacterNotFound(name.to_string()).into());
    };

    let client = super::backend_client(config)?;
    let session = ConversationSession::new(registry)
        .with_generation_timeout(Duration::from_secs(config.backend.request_timeout_secs));

    if !session.refresh_backend(&client).await.available {
        bail!("{} ({})", EngineError::BackendUnavailable, client.base_url());
    }

    let defaults = config.generation_params()?;
    let params = GenerationParams::new(
        options.model.unwrap_or(defaults.model),
        options.temperature.unwrap_or(defaults.temperature),
        options.max_tokens.unwrap_or(defaults.max_tokens),
    )?;
    let params = session.resolve_model(&params)?;

    println!("{avatar} Chatting with {name} (model: {})", params.model);
    println!("Commands: /quit, /clear (reset chat), /memory (what {name} remembers)");
    if let Some(history) = session.registry().history(name) {
        for turn in history.recent(3) {
            println!();
            println!("You: {}", turn.user);
            println!("{avatar} {name}: {}", turn.reply);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!();
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.registry().clear_history(name)?;
                println!("Chat cleared.");
                continue;
            }
            "/memory" => {
                let context = session
                    .registry()
                    .memory(name)
                    .map(|m| m.render_context())
                    .unwrap_or_default();
                if context.is_empty() {
                    println!("No memories yet. Start chatting!");
                } else {
                    println!("{context}");
                }
                continue;
            }
            _ => {}
        }

        let spinner = thinking_spinner(name)?;
        let outcome = tokio::select! {
            outcome = session.submit_turn(name, &line, &client, &params, options.auto_memory) => outcome,
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_and_clear();
                println!("(cancelled)");
                continue;
            }
        };
        spinner.finish_and_clear();

        match outcome {
            Ok(TurnOutcome::Ignored) => {}
            Ok(TurnOutcome::Replied(turn)) => println!("{avatar} {name}: {}", turn.reply),
            Ok(TurnOutcome::Failed { rendered, .. }) => println!("{rendered}"),
            Err(e @ EngineError::Persistence(_)) => {
                println!("❌ {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn thinking_spinner(name: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("{name} is thinking..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
