use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embeddings::EmbeddingServiceError),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod catalog;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod indexer;
pub mod mcp;
pub mod search;
pub mod store;
