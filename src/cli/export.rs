//! CLI `export` command: write a character card as JSON.

use std::path::Path;

use anyhow::{Context, Result};

use eliza::config::ElizaConfig;

/// Export a character card as JSON to stdout or a file.
pub fn export(config: &ElizaConfig, name: &str, output: Option<&Path>) -> Result<()> {
    let registry = super::open_registry(config)?;
    let card = registry.export(name)?;
    let json = serde_json::to_string_pretty(&card)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported '{name}' to {}.", path.display());
        }
        None => {
            println!("{json}");
            eprintln!("Exported '{name}'. {}", card.note);
        }
    }
    Ok(())
}
