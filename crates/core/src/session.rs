//! Per-user conversation state contract.
//!
//! The backing store is external (`bookline-db` ships SQLite and in-memory
//! implementations). The core only ever reads the last search keyword and
//! the most recent rendered result set, and appends turn records. "No entry
//! yet" is a normal state, never a failure.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("session store failure: {0}")]
pub struct SessionError(pub String);

/// One card from the most recent rendered result set. Synopsis requests
/// resolve their title argument against these entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedResult {
    pub title: String,
    pub detail_url: String,
}

/// Everything a finished turn writes back. Recorded after the response is
/// computed; a failed write is logged and swallowed, never surfaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnRecord {
    pub user_id: String,
    pub utterance: String,
    pub response_summary: String,
    /// The keyword this turn searched for, when it searched at all. `Some`
    /// overwrites the user's last keyword (last-write-wins); `None` leaves
    /// it untouched, so browsing a category never clobbers a prior search.
    pub resolved_keyword: Option<String>,
    /// The cards this turn rendered. A non-empty set replaces the user's
    /// stored result set; an empty one leaves the previous set in place.
    pub results: Vec<RenderedResult>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The user's last search keyword, or `None` when no search has been
    /// recorded yet. Callers must branch on `None` explicitly - a re-sort
    /// with no base query is a distinct user-facing outcome, not a crash.
    async fn last_keyword(&self, user_id: &str) -> Result<Option<String>, SessionError>;

    /// Resolves a title against the user's most recent rendered result set.
    /// Exact (trimmed) title matches win; otherwise the first entry whose
    /// title contains the query is returned.
    async fn result_link(&self, user_id: &str, title: &str)
        -> Result<Option<String>, SessionError>;

    /// Write-after-respond bookkeeping for one finished turn.
    async fn record_turn(&self, turn: TurnRecord) -> Result<(), SessionError>;
}
