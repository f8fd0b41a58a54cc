//! CLI `status` command: report backend reachability and served models.

use anyhow::Result;

use eliza::config::ElizaConfig;
use eliza::generation::BackendDiscovery;

pub async fn status(config: &ElizaConfig) -> Result<()> {
    let client = super::backend_client(config)?;
    let backend = client.discover().await;

    println!("ELIZA Status");
    println!("============");
    println!();
    println!("Backend:           {}", client.base_url());
    if !backend.available {
        println!("Status:            ❌ not reachable");
        println!();
        println!("Start the backend with `ollama serve`, then pull a model:");
        println!("  ollama pull llama3.2");
        return Ok(());
    }

    println!("Status:            ✅ LLM Active");
    if backend.models.is_empty() {
        println!("Models:            (none installed)");
    } else {
        println!("Models:");
        for model in &backend.models {
            let marker = if *model == config.backend.model { " (configured)" } else { "" };
            println!("  - {model}{marker}");
        }
    }
    if !config.backend.model.is_empty() && !backend.serves(&config.backend.model) {
        println!();
        println!("WARNING: configured model '{}' is not installed.", config.backend.model);
    }

    let registry = super::open_registry(config)?;
    println!();
    println!("Characters:        {}", registry.len());
    Ok(())
}
