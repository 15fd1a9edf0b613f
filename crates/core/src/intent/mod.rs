//! Canonical intents and their embedding-based resolution.
//!
//! All intent detection goes through one mechanism: a fixed catalog of
//! canonical phrases is embedded once at startup into an immutable
//! nearest-neighbor index, and every utterance is resolved against it.
//! Prefix-style trigger words are just additional phrases in the catalog,
//! never a separate code path.

mod index;
mod resolver;

pub use index::IntentIndex;
pub use resolver::IntentResolver;

use crate::catalog::Category;

/// The fixed set of user-request categories the bot can act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Keyword search against the storefront catalog.
    SearchBooks,
    /// Re-run the user's last search ordered by review score.
    SortByRating,
    /// Re-run the user's last search ordered by price.
    SortByPrice,
    /// Browse a fixed listing page.
    BrowseCategory(Category),
    /// Fetch the synopsis of a title from the latest rendered results.
    Synopsis,
}

/// One canonical phrase in the catalog. The catalog is fixed at build time;
/// insertion order is the deterministic tie-break for equidistant matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentPhrase {
    pub text: &'static str,
    pub intent: Intent,
}

impl IntentPhrase {
    const fn new(text: &'static str, intent: Intent) -> Self {
        Self { text, intent }
    }
}

/// The curated phrase catalog. Kept deliberately free of near-duplicate
/// phrasings across different intents so the distance threshold stays easy
/// to calibrate.
pub fn phrase_catalog() -> Vec<IntentPhrase> {
    vec![
        IntentPhrase::new("ค้นหาหนังสือ", Intent::SearchBooks),
        IntentPhrase::new("หาหนังสือ", Intent::SearchBooks),
        IntentPhrase::new("อยากได้หนังสือ", Intent::SearchBooks),
        IntentPhrase::new("เรียงตามคะแนน", Intent::SortByRating),
        IntentPhrase::new("เรียงตามเรตติ้ง", Intent::SortByRating),
        IntentPhrase::new("เรียงตามราคา", Intent::SortByPrice),
        IntentPhrase::new("เรียงจากราคาถูก", Intent::SortByPrice),
        IntentPhrase::new("ดูหนังสือขายดี", Intent::BrowseCategory(Category::Bestsellers)),
        IntentPhrase::new("หนังสือขายดีตอนนี้", Intent::BrowseCategory(Category::Bestsellers)),
        IntentPhrase::new("ดูหนังสือออกใหม่", Intent::BrowseCategory(Category::NewReleases)),
        IntentPhrase::new("หนังสือมาใหม่", Intent::BrowseCategory(Category::NewReleases)),
        IntentPhrase::new("ขอเรื่องย่อ", Intent::Synopsis),
        IntentPhrase::new("เรื่องย่อของหนังสือ", Intent::Synopsis),
    ]
}

/// Result of resolving one utterance. `intent` is `None` when the nearest
/// canonical phrase sat beyond the distance threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentMatch {
    pub intent: Option<Intent>,
    pub phrase: Option<String>,
    pub distance: f32,
}

impl IntentMatch {
    /// Extracts the free-text argument of an utterance: the remainder after
    /// the matched trigger phrase when the utterance starts with it verbatim,
    /// otherwise the whole utterance.
    pub fn argument<'a>(&self, utterance: &'a str) -> &'a str {
        let trimmed = utterance.trim();
        match &self.phrase {
            Some(phrase) => trimmed.strip_prefix(phrase.as_str()).unwrap_or(trimmed).trim(),
            None => trimmed,
        }
    }
}
