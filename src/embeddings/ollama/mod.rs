#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{EmbeddingProvider, EmbeddingServiceError};
use crate::config::OllamaConfig;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<Vec<f32>>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build ping URL")?;

        debug!("Pinging Ollama server at {}", url);

        self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping Ollama server")?;

        info!("Ollama server at {} is reachable", self.base_url);
        Ok(())
    }

    /// Generate an embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = self
            .base_url
            .join("/api/embeddings")
            .map_err(|e| EmbeddingServiceError::InvalidRequest(e.to_string()))?;

        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| EmbeddingServiceError::InvalidRequest(e.to_string()))?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let embedding = parse_embedding_response(&response_text)?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String, EmbeddingServiceError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let (failure, should_retry) = match error {
                        ureq::Error::StatusCode(status) => {
                            warn!(
                                "Ollama returned status {}, attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            (EmbeddingServiceError::Status(status), status >= 500)
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            (EmbeddingServiceError::Transport(error.to_string()), true)
                        }
                        other => {
                            warn!("Non-retryable error: {}", other);
                            (EmbeddingServiceError::Transport(other.to_string()), false)
                        }
                    };

                    if !should_retry {
                        return Err(failure);
                    }
                    last_error = Some(failure);

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        if self.retry_attempts > 1 {
            error!("All retry attempts failed for request to {}", self.base_url);
        }

        Err(last_error.unwrap_or_else(|| {
            EmbeddingServiceError::Transport("request was never attempted".to_string())
        }))
    }
}

impl EmbeddingProvider for OllamaClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        self.generate_embedding(text)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// A missing or empty `embedding` field is a failed call, not a zero-length vector.
fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
    let response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingServiceError::MalformedResponse(e.to_string()))?;

    match response.embedding {
        Some(embedding) if !embedding.is_empty() => Ok(embedding),
        Some(_) => Err(EmbeddingServiceError::MalformedResponse(
            "embedding is empty".to_string(),
        )),
        None => Err(EmbeddingServiceError::MalformedResponse(
            "missing `embedding` field".to_string(),
        )),
    }
}
