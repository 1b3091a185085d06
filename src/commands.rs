use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::indexer::{IndexingOptions, IndexingPipeline, IndexingStats, consistency};
use crate::mcp::{McpServer, SearchProductsHandler};
use crate::search::QueryPipeline;
use crate::store::RetrievalStore;

fn embedding_client(config: &Config) -> Result<OllamaClient> {
    OllamaClient::new(&config.ollama).context("Failed to create Ollama client")
}

/// Index the configured corpus and print what happened
#[inline]
pub fn index_corpus(config: &Config) -> Result<IndexingStats> {
    let store = RetrievalStore::open(config.index_dir());
    let client = embedding_client(config)?;
    let documents_dir = config.documents_dir();

    println!("📦 Indexing products from {}", documents_dir.display());

    let stats = IndexingPipeline::new(&store, &client)
        .with_options(IndexingOptions::from(&config.corpus))
        .reindex_corpus(&documents_dir)
        .context("Indexing failed")?;

    println!("✅ Indexing complete");
    println!("   📄 Records seen: {}", stats.records_seen);
    println!(
        "   🧠 Indexed: {} ({} replaced)",
        stats.records_indexed, stats.records_replaced
    );
    println!("   ⏭️  Unchanged: {}", stats.records_skipped);
    if stats.records_failed > 0 {
        println!("   ⚠️  Unreadable or malformed: {}", stats.records_failed);
    }
    if stats.embedding_failures > 0 {
        println!(
            "   ❌ Embedding failures: {} (retried on the next run)",
            stats.embedding_failures
        );
    }

    Ok(stats)
}

/// Run a query and print the matching products as JSON
#[inline]
pub fn search_products(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let store = RetrievalStore::open(config.index_dir());
    let client = embedding_client(config)?;
    let documents_dir = config.documents_dir();
    let limit = config.effective_limit(limit);

    info!("Searching for '{}' (limit {})", query, limit);

    let results = QueryPipeline::new(&store, &client, &documents_dir)
        .with_indexing_options(IndexingOptions::from(&config.corpus))
        .search(query, limit);

    if results.is_empty() {
        eprintln!("No matching products found.");
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Show the state of the stored index and the embedding service
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    let store = RetrievalStore::open(config.index_dir());

    println!("📊 Catalog MCP Status");
    println!();
    println!("📁 Storage: {}", store.root().display());
    for (label, path) in [
        ("Vector index", store.index_path()),
        ("Metadata list", store.metadata_path()),
        ("Fingerprints", store.fingerprints_path()),
    ] {
        let marker = if path.exists() { "✅" } else { "➖" };
        println!("   {} {}: {}", marker, label, path.display());
    }
    println!("📚 Corpus: {}", config.documents_dir().display());

    println!();
    println!("🔍 Index Consistency:");
    match store.load_state() {
        Ok(state) => {
            if let Some(index) = &state.index {
                println!("   📐 Dimension: {}", index.dimension());
            }
            let report = consistency::check(&state);
            println!("   📊 Vectors: {}", report.vectors);
            println!("   📊 Metadata entries: {}", report.metadata_entries);
            println!("   📊 Fingerprints: {}", report.fingerprints);
            if report.is_consistent {
                println!("   ✅ {}", report.summary());
            } else {
                println!("   ⚠️  {}", report.summary());
                println!("   Run 'catalog-mcp index' to repair the index.");
            }
        }
        Err(e) => {
            println!("   ❌ Failed to load index: {}", e);
        }
    }

    println!();
    println!("🤖 Embedding Service:");
    match embedding_client(config) {
        Ok(client) => match client.ping() {
            Ok(()) => println!(
                "   ✅ Ollama reachable at {} (model {})",
                client.base_url(),
                client.model()
            ),
            Err(e) => println!("   ❌ Ollama not reachable at {}: {}", client.base_url(), e),
        },
        Err(e) => println!("   ❌ Invalid Ollama configuration: {}", e),
    }

    Ok(())
}

/// Serve the `search_products` tool over stdio until EOF or Ctrl+C
#[inline]
pub async fn serve_mcp(config: &Config) -> Result<()> {
    let client = Arc::new(embedding_client(config)?);

    match client.ping() {
        Ok(()) => info!(
            "Ollama connected at {} with model {}",
            client.base_url(),
            client.model()
        ),
        Err(e) => warn!(
            "Ollama is not reachable at {}: {}. Searches will return no results until it is.",
            client.base_url(),
            e
        ),
    }

    let store = Arc::new(RetrievalStore::open(config.index_dir()));
    if !store.index_exists() {
        info!("Index not built yet; it will be built on the first search");
    }

    let server = Arc::new(McpServer::new(
        "catalog-mcp".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    server
        .register_tool(
            SearchProductsHandler::<OllamaClient>::tool_definition(config),
            SearchProductsHandler::new(store, client, config),
        )
        .await;

    // stdout carries the protocol, so user-facing notes go to stderr
    eprintln!("🌐 MCP server running on stdio with tool: search_products");
    eprintln!("Press Ctrl+C to stop the server");

    tokio::select! {
        result = Arc::clone(&server).serve_stdio() => {
            if let Err(e) = result {
                error!("MCP server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n📴 Received interrupt signal, shutting down...");
        }
    }

    info!("Shutdown complete");
    Ok(())
}
