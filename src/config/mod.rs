// Configuration management module
// TOML configuration for the embedding service, the product corpus and search defaults

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, CorpusConfig, OllamaConfig, SearchConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_base_dir()
}
