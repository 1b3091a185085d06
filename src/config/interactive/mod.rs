#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::{Path, PathBuf};

use super::{Config, OllamaConfig};
use crate::embeddings::OllamaClient;

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Catalog MCP Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Product Corpus").bold().yellow());
    configure_corpus(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!(
        "  Timeout: {}s",
        style(config.ollama.timeout_seconds).cyan()
    );
    eprintln!(
        "  Attempts per call: {}",
        style(config.ollama.retry_attempts).cyan()
    );

    eprintln!();
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Corpus & Search:").bold().yellow());
    eprintln!(
        "  Documents: {} (*.{})",
        style(config.documents_dir().display()).cyan(),
        config.corpus.extension
    );
    eprintln!("  Index: {}", style(config.index_dir().display()).cyan());
    eprintln!(
        "  Results per query: {} (max {})",
        style(config.search.default_limit).cyan(),
        config.search.max_limit
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: base_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = ["http", "https"];
    let current = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);
    let choice = Select::new()
        .with_prompt("Ollama protocol")
        .items(&protocols)
        .default(current)
        .interact()?;
    ollama.set_protocol(protocols[choice].to_string())?;

    // Each prompt checks its answer with the matching setter on a scratch copy
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| ollama.clone().set_host(input.clone()))
        .interact_text()?;
    ollama.set_host(host)?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| ollama.clone().set_port(*input))
        .interact_text()?;
    ollama.set_port(port)?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| ollama.clone().set_model(input.clone()))
        .interact_text()?;
    ollama.set_model(model)?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(ollama.timeout_seconds)
        .validate_with(|input: &u64| ollama.clone().set_timeout_seconds(*input))
        .interact_text()?;
    ollama.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

fn configure_corpus(config: &mut Config) -> Result<()> {
    let documents_dir: String = Input::new()
        .with_prompt("Product documents directory")
        .default(config.documents_dir().display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Directory cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.corpus.documents_dir = Some(PathBuf::from(documents_dir.trim()));
    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| client.with_timeout(std::time::Duration::from_secs(5)))
        .and_then(|client| client.ping())
        .is_ok()
}
