//! Embedding provider client.
//!
//! The resolver treats embeddings as an opaque deterministic function of the
//! input text for a given model version. The HTTP client speaks the
//! OpenAI-compatible `/embeddings` shape so any conforming endpoint works.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmbeddingsConfig;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(String),
    #[error("embedding endpoint returned status {0}")]
    Status(u16),
    #[error("embedding response malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Scales a vector to unit L2 norm in place. Zero vectors are left as-is so
/// the caller never divides by zero; their distance to anything is then
/// meaningless but bounded.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|component| component * component).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for component in vector.iter_mut() {
            *component /= magnitude;
        }
    }
}

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpEmbeddingClient {
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| EmbeddingError::Transport(error.to_string()))?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, model: config.model.clone(), api_key: config.api_key.clone() })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { model: &self.model, input: [text] });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| EmbeddingError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status(status.as_u16()));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingError::Malformed(error.to_string()))?;
        let datum = payload
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("response carried no embeddings".to_string()))?;
        if datum.embedding.is_empty() {
            return Err(EmbeddingError::Malformed("embedding vector was empty".to_string()));
        }
        Ok(datum.embedding)
    }
}
