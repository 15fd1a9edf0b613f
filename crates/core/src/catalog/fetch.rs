use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),
    #[error("request to catalog failed: {0}")]
    Transport(String),
    #[error("catalog returned status {0}")]
    Status(u16),
}

/// Seam between the pipeline and the network. Implementations must apply a
/// bounded request timeout; a timed-out or failed fetch is `FetchError`,
/// never a hang. Dropping the returned future cancels the request.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            // Error pages are never partially extracted.
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(|error| FetchError::Transport(error.to_string()))
    }
}
