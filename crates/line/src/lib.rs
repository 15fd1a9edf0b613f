//! LINE Messaging API integration.
//!
//! This crate is the bot's presentation and transport edge:
//! - **Webhook** (`webhook`) - inbound payload types and `X-Line-Signature`
//!   verification.
//! - **Flex composer** (`flex`) - the Response Composer: item records in,
//!   carousel cards out; plain text for everything else.
//! - **Reply client** (`client`) - outbound reply delivery against the
//!   Messaging API, behind a trait so tests stay offline.

pub mod client;
pub mod flex;
pub mod webhook;

pub use client::{HttpReplyClient, NoopReplyClient, ReplyClient, ReplyError};
pub use flex::{cards_message, text_message, OutboundMessage};
pub use webhook::{
    parse_envelope, verify_signature, EventSource, MessageContent, MessageEvent, WebhookEnvelope,
    WebhookError, WebhookEvent,
};
