//! CLI `import` command: create a character from an exported card.

use std::path::Path;

use anyhow::{bail, Context, Result};

use eliza::config::ElizaConfig;
use eliza::registry::{CharacterExport, EXPORT_FORMAT};

/// Import a character card written by `eliza export`.
pub fn import(config: &ElizaConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let card: CharacterExport =
        serde_json::from_str(&json).context("failed to parse character card JSON")?;
    if card.format != EXPORT_FORMAT {
        bail!("unsupported card format '{}' (expected {EXPORT_FORMAT})", card.format);
    }

    let mut registry = super::open_registry(config)?;
    let character = registry.import(card)?;
    println!("✅ Character '{}' imported! {}", character.name, character.avatar());
    Ok(())
}
