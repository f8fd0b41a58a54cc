//! CLI character commands: create, edit, list, show, delete.

use anyhow::{bail, Result};

use eliza::config::ElizaConfig;
use eliza::{CharacterUpdate, NewCharacter};

pub fn create(config: &ElizaConfig, input: NewCharacter) -> Result<()> {
    let mut registry = super::open_registry(config)?;
    let character = registry.create(input)?;
    println!("✅ Character '{}' created! {}", character.name, character.avatar());
    Ok(())
}

pub fn edit(config: &ElizaConfig, name: &str, update: CharacterUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("nothing to change; pass at least one of --personality, --backstory, --appearance, --example-dialogue");
    }
    let mut registry = super::open_registry(config)?;
    let character = registry.edit(name, update)?;
    println!("✅ Character '{}' updated", character.name);
    Ok(())
}

pub fn list(config: &ElizaConfig) -> Result<()> {
    let registry = super::open_registry(config)?;
    if registry.is_empty() {
        println!("No characters yet. Create one with `eliza create --name <NAME> --personality <TEXT>`.");
        return Ok(());
    }

    for name in registry.list() {
        let (Some(character), Some(stats)) = (registry.get(&name), registry.stats(&name)) else {
            continue;
        };
        println!(
            "{} {:<20} {:>4} turns  {:>3} facts  {:>3} moments",
            character.avatar(),
            name,
            stats.turns,
            stats.facts,
            stats.moments,
        );
    }
    Ok(())
}

pub fn show(config: &ElizaConfig, name: &str) -> Result<()> {
    let registry = super::open_registry(config)?;
    let (Some(character), Some(stats)) = (registry.get(name), registry.stats(name)) else {
        return Err(eliza::EngineError::CharacterNotFound(name.to_string()).into());
    };

    println!("{} {}", character.avatar(), character.name);
    println!("{}", "=".repeat(50));
    println!("  Personality:    {}", character.personality);
    if let Some(ref backstory) = character.backstory {
        println!("  Backstory:      {backstory}");
    }
    if let Some(ref appearance) = character.appearance {
        println!("  Appearance:     {appearance}");
    }
    println!("  Created:        {}", character.created);
    if let Some(ref dialogue) = character.example_dialogue {
        println!();
        println!("Example dialogue:");
        for line in dialogue.lines() {
            println!("  {line}");
        }
    }
    println!();
    println!("Memory:");
    println!("  Turns:          {}", stats.turns);
    println!("  Facts:          {}", stats.facts);
    println!("  Preferences:    {}", stats.preferences);
    println!("  Moments:        {}", stats.moments);
    Ok(())
}

pub fn delete(config: &ElizaConfig, name: &str) -> Result<()> {
    let mut registry = super::open_registry(config)?;
    let report = registry.delete(name)?;
    println!("✅ Character '{name}' deleted");
    if !(report.character && report.history && report.memory) {
        tracing::debug!(?report, "some records were already missing");
    }
    Ok(())
}
