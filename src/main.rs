mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eliza::config::ElizaConfig;

#[derive(Parser)]
#[command(name = "eliza", version, about = "Persona chat with long-term memory")]
struct Cli {
    /// Config file (defaults to ~/.eliza/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the AI backend and list available models
    Status,
    /// Create a new character
    Create(CreateArgs),
    /// Edit a character's profile
    Edit(EditArgs),
    /// List all characters
    List,
    /// Show a character's profile and memory counts
    Show { name: String },
    /// Delete a character with its chat history and memories
    Delete { name: String },
    /// Chat with a character
    Chat(ChatArgs),
    /// Inspect or edit a character's memory bank
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
    /// Export a character card as JSON
    Export {
        name: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a character card from a JSON file
    Import { file: PathBuf },
    /// Run database diagnostics
    Doctor,
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    personality: String,
    #[arg(long)]
    backstory: Option<String>,
    #[arg(long)]
    appearance: Option<String>,
    #[arg(long)]
    example_dialogue: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    name: String,
    #[arg(long)]
    personality: Option<String>,
    /// Pass an empty string to clear
    #[arg(long)]
    backstory: Option<String>,
    #[arg(long)]
    appearance: Option<String>,
    #[arg(long)]
    example_dialogue: Option<String>,
}

#[derive(Args)]
struct ChatArgs {
    name: String,
    /// Model to use (defaults to config, then the first model the backend serves)
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Don't learn memories from this conversation
    #[arg(long)]
    no_memory: bool,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show everything the character remembers
    Show { name: String },
    /// Add a fact about the user
    Add { name: String, fact: String },
    /// Remember a moment, with comma-separated tags
    Tag {
        name: String,
        moment: String,
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Forget everything
    Clear { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ElizaConfig::load_from(path)?,
        None => ElizaConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Status => cli::status::status(&config).await?,
        Command::Create(args) => cli::characters::create(
            &config,
            eliza::NewCharacter {
                name: args.name,
                personality: args.personality,
                backstory: args.backstory,
                appearance: args.appearance,
                example_dialogue: args.example_dialogue,
            },
        )?,
        Command::Edit(args) => cli::characters::edit(
            &config,
            &args.name,
            eliza::CharacterUpdate {
                personality: args.personality,
                backstory: args.backstory,
                appearance: args.appearance,
                example_dialogue: args.example_dialogue,
            },
        )?,
        Command::List => cli::characters::list(&config)?,
        Command::Show { name } => cli::characters::show(&config, &name)?,
        Command::Delete { name } => cli::characters::delete(&config, &name)?,
        Command::Chat(args) => {
            let options = cli::chat::ChatOptions {
                model: args.model,
                temperature: args.temperature,
                max_tokens: args.max_tokens,
                auto_memory: !args.no_memory && config.generation.auto_memory,
            };
            cli::chat::chat(&config, &args.name, options).await?
        }
        Command::Memory { action } => match action {
            MemoryAction::Show { name } => cli::memory::show(&config, &name)?,
            MemoryAction::Add { name, fact } => cli::memory::add(&config, &name, &fact)?,
            MemoryAction::Tag { name, moment, tags } => {
                cli::memory::tag(&config, &name, &moment, &tags)?
            }
            MemoryAction::Clear { name } => cli::memory::clear(&config, &name)?,
        },
        Command::Export { name, output } => {
            cli::export::export(&config, &name, output.as_deref())?
        }
        Command::Import { file } => cli::import::import(&config, &file)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
