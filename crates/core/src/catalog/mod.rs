//! Catalog lookup: request shapes, item records, and the extraction
//! pipeline over the storefront's search and listing pages.

mod extract;
mod fetch;
mod record;

pub use extract::{ExtractionPipeline, MAX_RECORDS};
pub use fetch::{FetchError, HttpPageFetcher, PageFetcher};
pub use record::ItemRecord;

use reqwest::Url;

/// Result ordering requested from the storefront. `Relevance` is the
/// storefront default (no sort parameter at all).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Relevance,
    ByRating,
    ByPrice,
}

impl SortMode {
    fn query_value(self) -> Option<&'static str> {
        match self {
            Self::Relevance => None,
            Self::ByRating => Some("rate"),
            Self::ByPrice => Some("price"),
        }
    }
}

/// Fixed listing pages reachable through the browse intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Bestsellers,
    NewReleases,
}

impl Category {
    pub fn listing_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::Bestsellers => format!("{base}/bestseller"),
            Self::NewReleases => format!("{base}/new-release"),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bestsellers => "หนังสือขายดี",
            Self::NewReleases => "หนังสือออกใหม่",
        }
    }
}

/// One unit of work for the extraction pipeline. Keyword search and listing
/// browse are mutually exclusive variants of the same request type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchRequest {
    Search { keyword: String, sort: SortMode },
    Listing { url: String },
}

impl FetchRequest {
    /// Builds the target address deterministically. Keyword searches combine
    /// the fixed search path with a URL-encoded `title` parameter and an
    /// optional `sortBy`; listings use their address verbatim.
    pub fn target_url(&self, base_url: &str) -> Result<Url, FetchError> {
        match self {
            Self::Search { keyword, sort } => {
                let base = format!("{}/search-result", base_url.trim_end_matches('/'));
                let mut url = Url::parse(&base)
                    .map_err(|error| FetchError::InvalidUrl(error.to_string()))?;
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.append_pair("title", keyword);
                    if let Some(sort_value) = sort.query_value() {
                        pairs.append_pair("sortBy", sort_value);
                    }
                }
                Ok(url)
            }
            Self::Listing { url } => {
                Url::parse(url).map_err(|error| FetchError::InvalidUrl(error.to_string()))
            }
        }
    }
}
