//! Offline doubles shared by the handler and route tests. The embedding
//! stub places every canonical phrase on its own orthogonal axis so exact
//! phrases resolve at distance zero and unrelated text lands far away.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;

use bookline_core::catalog::{ExtractionPipeline, FetchError, PageFetcher};
use bookline_core::embeddings::{EmbeddingClient, EmbeddingError};
use bookline_core::intent::{phrase_catalog, IntentIndex, IntentResolver};
use bookline_core::session::SessionStore;
use bookline_line::client::{ReplyClient, ReplyError};
use bookline_line::flex::OutboundMessage;

use crate::handler::UtteranceHandler;

pub const STORE_BASE: &str = "https://store.test";

/// One well-formed search result in the storefront's markup.
pub const SEARCH_PAGE: &str = r#"
    <div data-price="250">
        <div class="item-img-block">
            <img data-src="https://cdn.store.test/cover-1.jpg" src="/lazy.gif" />
        </div>
        <div class="item-details">
            <p class="txt-normal"><a href="https://store.test/product/1">สามก๊ก</a></p>
            <p class="txt-light"><a href="/author/1">เจ้าพระยาพระคลัง (หน)</a></p>
            <span class="vote-scores">4.8</span>
        </div>
    </div>
"#;

pub const EMPTY_PAGE: &str = "<html><body><p>no results</p></body></html>";

pub const DETAIL_PAGE: &str = r#"
    <html><head>
        <meta property="og:description" content="มหากาพย์สงครามสามแผ่นดิน" />
    </head><body></body></html>
"#;

pub struct StubEmbeddingClient {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    fail: bool,
}

impl StubEmbeddingClient {
    pub fn for_catalog() -> Self {
        let texts: Vec<&'static str> =
            phrase_catalog().into_iter().map(|phrase| phrase.text).collect();
        let dimension = texts.len() + 1;
        let mut vectors = HashMap::new();
        for (position, text) in texts.iter().enumerate() {
            vectors.insert((*text).to_string(), axis(dimension, position));
        }
        Self { vectors, fallback: axis(dimension, dimension - 1), fail: false }
    }

    pub fn failing() -> Self {
        Self { vectors: HashMap::new(), fallback: vec![1.0], fail: true }
    }

    /// Routes a full utterance onto the vector of its trigger phrase, so
    /// "trigger + argument" utterances resolve like the trigger itself.
    pub fn with_alias(mut self, utterance: &str, phrase: &str) -> Self {
        let vector =
            self.vectors.get(phrase).cloned().unwrap_or_else(|| self.fallback.clone());
        self.vectors.insert(utterance.to_string(), vector);
        self
    }
}

fn axis(dimension: usize, index: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    vector[index] = 1.0;
    vector
}

#[async_trait]
impl EmbeddingClient for StubEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Status(503));
        }
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

pub struct StubPageFetcher {
    body: Result<String, FetchError>,
}

impl StubPageFetcher {
    pub fn returning(body: &str) -> Self {
        Self { body: Ok(body.to_string()) }
    }

    pub fn failing() -> Self {
        Self { body: Err(FetchError::Status(503)) }
    }
}

#[async_trait]
impl PageFetcher for StubPageFetcher {
    async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
        self.body.clone()
    }
}

#[derive(Default)]
pub struct RecordingReplyClient {
    replies: Mutex<Vec<(String, Vec<OutboundMessage>)>>,
}

impl RecordingReplyClient {
    pub fn replies(&self) -> Vec<(String, Vec<OutboundMessage>)> {
        self.replies.lock().expect("reply log lock").clone()
    }
}

#[async_trait]
impl ReplyClient for RecordingReplyClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        self.replies.lock().expect("reply log lock").push((reply_token.to_string(), messages));
        Ok(())
    }
}

pub async fn handler_with(
    client: StubEmbeddingClient,
    fetcher: StubPageFetcher,
    sessions: Arc<dyn SessionStore>,
) -> UtteranceHandler {
    let index = IntentIndex::build(&client, phrase_catalog()).await.expect("index builds");
    let resolver = IntentResolver::new(Arc::new(client), index, 0.45);
    let pipeline = ExtractionPipeline::new(Arc::new(fetcher), STORE_BASE);
    UtteranceHandler::new(resolver, pipeline, sessions)
}

/// A handler whose index was built while the provider was healthy but whose
/// per-utterance embedding calls now fail.
pub async fn handler_with_failing_provider(
    fetcher: StubPageFetcher,
    sessions: Arc<dyn SessionStore>,
) -> UtteranceHandler {
    let healthy = StubEmbeddingClient::for_catalog();
    let index = IntentIndex::build(&healthy, phrase_catalog()).await.expect("index builds");
    let resolver = IntentResolver::new(Arc::new(StubEmbeddingClient::failing()), index, 0.45);
    let pipeline = ExtractionPipeline::new(Arc::new(fetcher), STORE_BASE);
    UtteranceHandler::new(resolver, pipeline, sessions)
}
