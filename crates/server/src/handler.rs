//! Per-utterance orchestration: resolve the intent, run the matching
//! catalog lookup, compose the reply, and hand back the turn record for
//! write-after-respond bookkeeping.

use std::sync::Arc;

use tracing::warn;

use bookline_core::catalog::{Category, ExtractionPipeline, FetchRequest, SortMode};
use bookline_core::errors::BotError;
use bookline_core::intent::{Intent, IntentResolver};
use bookline_core::session::{RenderedResult, SessionError, SessionStore, TurnRecord};
use bookline_line::flex::{cards_message, text_message, OutboundMessage};

const CARDS_ALT_TEXT: &str = "หนังสือที่ค้นพบ";
const NO_RESULTS_MESSAGE: &str = "ไม่พบข้อมูลหนังสือที่ค้นหา";
const EMPTY_KEYWORD_MESSAGE: &str = "กรุณาระบุชื่อหนังสือที่ต้องการค้นหา";
const SYNOPSIS_PROMPT_MESSAGE: &str = "กรุณาระบุชื่อหนังสือจากผลการค้นหาล่าสุด";
const SYNOPSIS_NOT_FOUND_MESSAGE: &str = "ไม่พบหนังสือชื่อนี้ในผลการค้นหาล่าสุด";
const SYNOPSIS_MISSING_MESSAGE: &str = "ยังไม่มีเรื่องย่อสำหรับหนังสือเล่มนี้";

/// A computed response plus the bookkeeping it implies. The caller delivers
/// the message first and records the turn afterwards.
pub struct HandledTurn {
    pub message: OutboundMessage,
    pub turn: TurnRecord,
}

pub struct UtteranceHandler {
    resolver: IntentResolver,
    pipeline: ExtractionPipeline,
    sessions: Arc<dyn SessionStore>,
}

impl UtteranceHandler {
    pub fn new(
        resolver: IntentResolver,
        pipeline: ExtractionPipeline,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self { resolver, pipeline, sessions }
    }

    /// Handles one inbound utterance. Never fails: every branch of the
    /// error taxonomy maps to a fixed user-facing message.
    pub async fn handle(&self, user_id: &str, utterance: &str) -> HandledTurn {
        let matched = match self.resolver.resolve(utterance).await {
            Ok(matched) => matched,
            Err(error) => {
                warn!(
                    event_name = "intent.resolve.provider_unavailable",
                    error = %error,
                    "embedding provider unavailable"
                );
                let message = BotError::ProviderUnavailable(error).user_message();
                return self.text_turn(user_id, utterance, message, "provider_unavailable", None);
            }
        };

        match matched.intent {
            None => {
                let message = BotError::UnknownIntent.user_message();
                self.text_turn(user_id, utterance, message, "unknown_intent", None)
            }
            Some(Intent::SearchBooks) => {
                let keyword = matched.argument(utterance).to_string();
                if keyword.is_empty() {
                    return self.text_turn(
                        user_id,
                        utterance,
                        EMPTY_KEYWORD_MESSAGE,
                        "empty_keyword",
                        None,
                    );
                }
                self.search(user_id, utterance, keyword, SortMode::Relevance).await
            }
            Some(Intent::SortByRating) => {
                self.resort(user_id, utterance, SortMode::ByRating).await
            }
            Some(Intent::SortByPrice) => self.resort(user_id, utterance, SortMode::ByPrice).await,
            Some(Intent::BrowseCategory(category)) => {
                self.browse(user_id, utterance, category).await
            }
            Some(Intent::Synopsis) => {
                let title = matched.argument(utterance).to_string();
                self.synopsis(user_id, utterance, &title).await
            }
        }
    }

    /// Write-after-respond: failures are logged and swallowed so the reply
    /// that was already delivered stays delivered.
    pub async fn record_turn(&self, turn: TurnRecord) {
        if let Err(error) = self.sessions.record_turn(turn).await {
            warn!(
                event_name = "session.record_turn.failed",
                error = %error,
                "session write failed after the response was delivered"
            );
        }
    }

    async fn search(
        &self,
        user_id: &str,
        utterance: &str,
        keyword: String,
        sort: SortMode,
    ) -> HandledTurn {
        let request = FetchRequest::Search { keyword: keyword.clone(), sort };
        match self.pipeline.extract(&request).await {
            Err(error) => {
                warn!(event_name = "catalog.extract.failed", error = %error, "catalog fetch failed");
                let message = BotError::FetchFailed(error).user_message();
                // The keyword is still recorded: a follow-up re-sort retries
                // the same query, matching the storefront's own behavior.
                self.text_turn(user_id, utterance, message, "fetch_failed", Some(keyword))
            }
            Ok(records) if records.is_empty() => {
                self.text_turn(user_id, utterance, NO_RESULTS_MESSAGE, "no_results", Some(keyword))
            }
            Ok(records) => {
                let results: Vec<RenderedResult> = records
                    .iter()
                    .map(|record| RenderedResult {
                        title: record.title.clone(),
                        detail_url: record.detail_url.clone(),
                    })
                    .collect();
                HandledTurn {
                    message: cards_message(&records, CARDS_ALT_TEXT),
                    turn: TurnRecord {
                        user_id: user_id.to_string(),
                        utterance: utterance.to_string(),
                        response_summary: format!("cards:{}", records.len()),
                        resolved_keyword: Some(keyword),
                        results,
                    },
                }
            }
        }
    }

    async fn resort(&self, user_id: &str, utterance: &str, sort: SortMode) -> HandledTurn {
        match self.sessions.last_keyword(user_id).await {
            Err(error) => self.session_read_failed(user_id, utterance, error),
            Ok(None) => {
                let message = BotError::NoPriorKeyword.user_message();
                self.text_turn(user_id, utterance, message, "no_prior_keyword", None)
            }
            Ok(Some(keyword)) => self.search(user_id, utterance, keyword, sort).await,
        }
    }

    async fn browse(&self, user_id: &str, utterance: &str, category: Category) -> HandledTurn {
        let request =
            FetchRequest::Listing { url: category.listing_url(self.pipeline.base_url()) };
        match self.pipeline.extract(&request).await {
            Err(error) => {
                warn!(event_name = "catalog.extract.failed", error = %error, "catalog fetch failed");
                let message = BotError::FetchFailed(error).user_message();
                self.text_turn(user_id, utterance, message, "fetch_failed", None)
            }
            Ok(records) if records.is_empty() => {
                self.text_turn(user_id, utterance, NO_RESULTS_MESSAGE, "no_results", None)
            }
            Ok(records) => {
                let results: Vec<RenderedResult> = records
                    .iter()
                    .map(|record| RenderedResult {
                        title: record.title.clone(),
                        detail_url: record.detail_url.clone(),
                    })
                    .collect();
                HandledTurn {
                    // Browsing never overwrites the user's last search
                    // keyword; only the rendered result set is replaced.
                    message: cards_message(&records, category.display_name()),
                    turn: TurnRecord {
                        user_id: user_id.to_string(),
                        utterance: utterance.to_string(),
                        response_summary: format!(
                            "browse:{}:{}",
                            category.display_name(),
                            records.len()
                        ),
                        resolved_keyword: None,
                        results,
                    },
                }
            }
        }
    }

    async fn synopsis(&self, user_id: &str, utterance: &str, title: &str) -> HandledTurn {
        if title.is_empty() {
            return self.text_turn(
                user_id,
                utterance,
                SYNOPSIS_PROMPT_MESSAGE,
                "synopsis_no_title",
                None,
            );
        }
        match self.sessions.result_link(user_id, title).await {
            Err(error) => self.session_read_failed(user_id, utterance, error),
            Ok(None) => self.text_turn(
                user_id,
                utterance,
                SYNOPSIS_NOT_FOUND_MESSAGE,
                "synopsis_not_in_results",
                None,
            ),
            Ok(Some(detail_url)) => match self.pipeline.synopsis(&detail_url).await {
                Err(error) => {
                    warn!(event_name = "catalog.synopsis.failed", error = %error, "synopsis fetch failed");
                    let message = BotError::FetchFailed(error).user_message();
                    self.text_turn(user_id, utterance, message, "fetch_failed", None)
                }
                Ok(None) => self.text_turn(
                    user_id,
                    utterance,
                    SYNOPSIS_MISSING_MESSAGE,
                    "synopsis_missing",
                    None,
                ),
                Ok(Some(synopsis)) => HandledTurn {
                    message: text_message(synopsis),
                    turn: TurnRecord {
                        user_id: user_id.to_string(),
                        utterance: utterance.to_string(),
                        response_summary: "synopsis".to_string(),
                        resolved_keyword: None,
                        results: vec![],
                    },
                },
            },
        }
    }

    fn session_read_failed(
        &self,
        user_id: &str,
        utterance: &str,
        error: SessionError,
    ) -> HandledTurn {
        warn!(event_name = "session.read.failed", error = %error, "session read failed");
        let message = "เกิดข้อผิดพลาดในการดึงข้อมูล โปรดลองใหม่อีกครั้ง";
        self.text_turn(user_id, utterance, message, "session_read_failed", None)
    }

    fn text_turn(
        &self,
        user_id: &str,
        utterance: &str,
        message: &str,
        summary: &str,
        resolved_keyword: Option<String>,
    ) -> HandledTurn {
        HandledTurn {
            message: text_message(message),
            turn: TurnRecord {
                user_id: user_id.to_string(),
                utterance: utterance.to_string(),
                response_summary: summary.to_string(),
                resolved_keyword,
                results: vec![],
            },
        }
    }
}
