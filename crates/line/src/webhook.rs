//! Inbound webhook payloads and signature verification.
//!
//! LINE signs every delivery with HMAC-SHA256 over the raw request body,
//! base64-encoded into the `X-Line-Signature` header. Verification runs
//! before any parsing; an unsigned or mis-signed body is rejected outright.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("webhook payload malformed: {0}")]
    MalformedPayload(String),
}

/// Constant-time check of the delivery signature against the channel
/// secret. Returns `false` for undecodable signatures rather than erroring;
/// the caller treats both the same way.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope, WebhookError> {
    serde_json::from_slice(body).map_err(|error| WebhookError::MalformedPayload(error.to_string()))
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "message")]
    Message(MessageEvent),
    /// Follow/unfollow/postback and anything else the bot does not act on.
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "replyToken")]
    pub reply_token: String,
    pub source: EventSource,
    pub message: MessageContent,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub source_type: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    #[serde(rename = "text")]
    Text { text: String },
    /// Stickers, images, locations - ignored.
    #[serde(other)]
    Unsupported,
}
