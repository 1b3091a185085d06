//! MCP Tools Implementation
//!
//! The `search_products` tool, backed by the query pipeline.

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::indexer::IndexingOptions;
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool};
use crate::mcp::server::ToolHandler;
use crate::search::QueryPipeline;
use crate::store::RetrievalStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const SEARCH_PRODUCTS_TOOL: &str = "search_products";

/// Product search tool handler
pub struct SearchProductsHandler<E> {
    store: Arc<RetrievalStore>,
    embedder: Arc<E>,
    config: Config,
    corpus_dir: PathBuf,
    /// Indexing and querying share one storage location and must not overlap
    guard: Mutex<()>,
}

impl<E> SearchProductsHandler<E>
where
    E: EmbeddingProvider + Send + Sync + 'static,
{
    #[inline]
    pub fn new(store: Arc<RetrievalStore>, embedder: Arc<E>, config: &Config) -> Self {
        Self {
            store,
            embedder,
            corpus_dir: config.documents_dir(),
            config: config.clone(),
            guard: Mutex::new(()),
        }
    }

    /// Create the search_products tool definition
    #[inline]
    pub fn tool_definition(config: &Config) -> Tool {
        Tool {
            name: SEARCH_PRODUCTS_TOOL.to_string(),
            description: Some(
                "Search the product catalog for items matching a natural language description"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What the shopper is looking for"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": config.search.max_limit,
                        "description": format!(
                            "Maximum number of results (default: {})",
                            config.search.default_limit
                        )
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl<E> ToolHandler for SearchProductsHandler<E>
where
    E: EmbeddingProvider + Send + Sync + 'static,
{
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();

        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?
            .to_string();

        let requested = match args.get("limit") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|limit| usize::try_from(limit).ok())
                    .ok_or_else(|| anyhow!("limit must be a positive integer"))?,
            ),
        };
        let limit = self.config.effective_limit(requested);

        debug!("Searching products: query='{}', limit={}", query, limit);

        let _guard = self.guard.lock().await;
        let store = Arc::clone(&self.store);
        let embedder = Arc::clone(&self.embedder);
        let corpus_dir = self.corpus_dir.clone();
        let indexing = IndexingOptions {
            show_progress: false,
            ..IndexingOptions::from(&self.config.corpus)
        };

        let results = tokio::task::spawn_blocking(move || {
            QueryPipeline::new(&store, &*embedder, &corpus_dir)
                .with_indexing_options(indexing)
                .search(&query, limit)
        })
        .await
        .context("search task panicked")?;

        let response = json!({ "results": results });
        Ok(CallToolResult::text(serde_json::to_string_pretty(&response)?))
    }
}
