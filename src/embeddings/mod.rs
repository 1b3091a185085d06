// Embeddings module
// Turns product text into dense vectors through an external embedding service

pub mod ollama;

#[cfg(test)]
pub(crate) mod fake;

use thiserror::Error;

pub use ollama::OllamaClient;

/// Failure of a single call to the embedding service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingServiceError {
    #[error("Embedding service returned HTTP {0}")]
    Status(u16),

    #[error("Embedding service unreachable: {0}")]
    Transport(String),

    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("Invalid embedding request: {0}")]
    InvalidRequest(String),
}

/// Converts text into a fixed-dimension vector.
///
/// Implementations make exactly one attempt per call unless configured otherwise
/// and report failure through [`EmbeddingServiceError`]; the caller decides whether
/// to skip, retry or abort.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for &T {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        (**self).embed(text)
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<T> {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        (**self).embed(text)
    }
}
