use std::cell::RefCell;

use super::{EmbeddingProvider, EmbeddingServiceError};

/// Scripted embedder for pipeline tests.
///
/// The first rule whose needle occurs in the text decides the vector; texts that
/// match a failure needle get an HTTP 500. Every call is recorded.
pub(crate) struct FakeEmbedder {
    dimension: usize,
    rules: Vec<(String, Vec<f32>)>,
    failures: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rules: Vec::new(),
            failures: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_rule(mut self, needle: &str, vector: Vec<f32>) -> Self {
        self.rules.push((needle.to_string(), vector));
        self
    }

    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingServiceError> {
        self.calls.borrow_mut().push(text.to_string());

        if self.failures.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(EmbeddingServiceError::Status(500));
        }

        let vector = self
            .rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map_or_else(|| vec![0.0; self.dimension], |(_, vector)| vector.clone());
        Ok(vector)
    }
}
