use std::path::PathBuf;

use catalog_mcp::Result;
use catalog_mcp::commands::{index_corpus, search_products, serve_mcp, show_status};
use catalog_mcp::config::{Config, run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalog-mcp")]
#[command(about = "A product catalog indexing and semantic search system with MCP server")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the index and (by default) the product documents
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and corpus settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed new and changed product records into the index
    Index,
    /// Search the catalog for products matching a description
    Search {
        /// Natural language description of the product
        query: String,
        /// Maximum number of results
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Show index and embedding service status
    Status,
    /// Start MCP server on stdio
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => Config::default_base_dir()
            .map_err(|e| catalog_mcp::CatalogError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Index => {
            index_corpus(&Config::load(&base_dir)?)?;
        }
        Commands::Search { query, limit } => {
            search_products(&Config::load(&base_dir)?, &query, limit)?;
        }
        Commands::Status => {
            show_status(&Config::load(&base_dir)?)?;
        }
        Commands::Serve => {
            serve_mcp(&Config::load(&base_dir)?).await?;
        }
    }

    Ok(())
}
