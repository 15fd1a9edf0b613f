//! Bookline core - intent resolution and catalog extraction
//!
//! This crate holds everything that carries design risk in the bot:
//!
//! - **Intent resolution** (`intent`) - maps a free-form utterance onto one
//!   of a fixed set of canonical intents via embedding nearest-neighbor
//!   lookup, with a principled `unknown` reject path.
//! - **Extraction pipeline** (`catalog`) - fetches a storefront search or
//!   listing page and extracts a bounded, ordered list of item records with
//!   per-field fallbacks.
//! - **Session contract** (`session`) - the read/write interface to per-user
//!   conversation state; backing stores live in `bookline-db`.
//!
//! Transport (webhook, reply delivery) lives in `bookline-line` and
//! `bookline-server`; this crate never touches inbound HTTP.

pub mod catalog;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod intent;
pub mod session;
#[cfg(test)]
mod test_support;

pub use catalog::{
    Category, ExtractionPipeline, FetchError, FetchRequest, HttpPageFetcher, ItemRecord,
    PageFetcher, SortMode, MAX_RECORDS,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use embeddings::{EmbeddingClient, EmbeddingError, HttpEmbeddingClient};
pub use errors::BotError;
pub use intent::{phrase_catalog, Intent, IntentIndex, IntentMatch, IntentPhrase, IntentResolver};
pub use session::{RenderedResult, SessionError, SessionStore, TurnRecord};
