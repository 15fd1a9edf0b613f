use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::flex::OutboundMessage;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply delivery failed: {0}")]
    Transport(String),
    #[error("reply endpoint returned status {0}")]
    Status(u16),
}

/// Outbound reply delivery seam. The webhook handler computes a response
/// first and delivers it through this trait; tests swap in a recorder.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError>;
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

/// Messaging API reply client. One short-lived POST per inbound event,
/// authorized with the channel access token.
pub struct HttpReplyClient {
    client: reqwest::Client,
    endpoint: String,
    channel_token: SecretString,
}

impl HttpReplyClient {
    pub fn new(
        api_base: &str,
        channel_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ReplyError::Transport(error.to_string()))?;
        let endpoint = format!("{}/v2/bot/message/reply", api_base.trim_end_matches('/'));
        Ok(Self { client, endpoint, channel_token })
    }
}

#[async_trait]
impl ReplyClient for HttpReplyClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.channel_token.expose_secret())
            .json(&ReplyRequest { reply_token, messages: &messages })
            .send()
            .await
            .map_err(|error| ReplyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplyError::Status(status.as_u16()));
        }
        debug!(
            event_name = "line.reply.delivered",
            message_count = messages.len(),
            "reply delivered"
        );
        Ok(())
    }
}

/// Discards replies. Used in offline smoke runs and as a default in tests.
#[derive(Default)]
pub struct NoopReplyClient;

#[async_trait]
impl ReplyClient for NoopReplyClient {
    async fn reply(
        &self,
        _reply_token: &str,
        _messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        Ok(())
    }
}
