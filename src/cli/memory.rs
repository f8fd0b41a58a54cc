//! CLI `memory` commands.

use anyhow::Result;

use eliza::config::ElizaConfig;
use eliza::EngineError;

pub fn show(config: &ElizaConfig, name: &str) -> Result<()> {
    let registry = super::open_registry(config)?;
    let memory = registry
        .memory(name)
        .ok_or_else(|| EngineError::CharacterNotFound(name.to_string()))?;

    println!("Memory Bank: {name}");
    println!("{}", "=".repeat(40));
    if memory.is_empty() {
        println!("No memories yet. Start chatting!");
        return Ok(());
    }

    if !memory.user_facts.is_empty() {
        println!();
        println!("Facts ({}):", memory.user_facts.len());
        for fact in &memory.user_facts {
            println!("  - {}", fact.fact);
        }
    }

    if !memory.preferences.is_empty() {
        println!();
        println!("Preferences:");
        for (category, value) in memory.preferences.iter() {
            println!("  {:<12} {}", format!("{category}:"), value);
        }
    }

    if !memory.important_moments.is_empty() {
        println!();
        println!("Moments ({}):", memory.important_moments.len());
        for moment in &memory.important_moments {
            println!("  - [{}] {}", moment.tag_label(), moment.moment);
        }
    }

    if !memory.last_topics.is_empty() {
        println!();
        println!("Recent topics:     {}", memory.last_topics.join(", "));
    }
    Ok(())
}

pub fn add(config: &ElizaConfig, name: &str, fact: &str) -> Result<()> {
    let mut registry = super::open_registry(config)?;
    if registry.add_fact(name, fact)? {
        println!("✅ Added to memory!");
    } else {
        println!("Already remembered.");
    }
    Ok(())
}

pub fn tag(config: &ElizaConfig, name: &str, moment: &str, tags: &str) -> Result<()> {
    let mut registry = super::open_registry(config)?;
    registry.tag_moment(name, moment, tags)?;
    println!("✅ Moment tagged!");
    Ok(())
}

pub fn clear(config: &ElizaConfig, name: &str) -> Result<()> {
    let mut registry = super::open_registry(config)?;
    registry.clear_memory(name)?;
    println!("✅ Memories cleared");
    Ok(())
}
