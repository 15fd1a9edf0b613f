//! Deterministic stand-ins shared by unit tests in this crate.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::embeddings::{EmbeddingClient, EmbeddingError};

/// Embedding client with fixed vectors per input text. `axes` assigns each
/// known text its own orthogonal unit axis and sends every unknown text to
/// one shared far axis, which makes exact matches land at distance 0 and
/// unrelated text at distance 1.
pub struct StubEmbeddingClient {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    fail: bool,
}

impl StubEmbeddingClient {
    pub fn axes(texts: &[&str]) -> Self {
        let dimension = texts.len() + 1;
        let mut vectors = HashMap::new();
        for (position, text) in texts.iter().enumerate() {
            let mut vector = vec![0.0; dimension];
            vector[position] = 1.0;
            vectors.insert((*text).to_string(), vector);
        }
        let mut fallback = vec![0.0; dimension];
        fallback[dimension - 1] = 1.0;
        Self { vectors, fallback, fail: false }
    }

    pub fn with_vectors(pairs: Vec<(&str, Vec<f32>)>) -> Self {
        let dimension = pairs.first().map(|(_, vector)| vector.len()).unwrap_or(1);
        let vectors =
            pairs.into_iter().map(|(text, vector)| (text.to_string(), vector)).collect();
        Self { vectors, fallback: vec![0.0; dimension], fail: false }
    }

    pub fn failing() -> Self {
        Self { vectors: HashMap::new(), fallback: Vec::new(), fail: true }
    }

    pub fn with_extra(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl EmbeddingClient for StubEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Transport("stubbed outage".to_string()));
        }
        Ok(self.vector_for(text))
    }
}
