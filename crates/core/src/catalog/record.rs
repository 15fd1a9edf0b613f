/// Placeholder substituted when an item carries no usable title.
pub const FALLBACK_TITLE: &str = "ไม่มีชื่อหนังสือ";
/// Placeholder detail address; points at the storefront root so downstream
/// card buttons always carry a well-formed URI.
pub const FALLBACK_DETAIL_URL: &str = "https://www.naiin.com/";
/// Placeholder author string.
pub const FALLBACK_AUTHOR: &str = "ไม่มีผู้แต่ง";
/// Sentinel for a missing price ("unspecified").
pub const FALLBACK_PRICE: &str = "ไม่ระบุ";
/// Sentinel for a missing or empty review score.
pub const FALLBACK_RATING: &str = "ไม่มีคะแนน";
/// Default cover shown when the page carries no absolute image address.
pub const FALLBACK_IMAGE_URL: &str =
    "https://drive.google.com/uc?export=view&id=13ihm2R69rRvt2tEHWsYbefED9CGP39vq";

/// One extracted catalog entry, ready for presentation. A pure value:
/// created fresh per extraction, never mutated afterwards, never shared
/// across requests. Every field is non-empty after fallback and
/// `image_url` is always absolute http(s).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRecord {
    pub title: String,
    pub author: String,
    pub price: String,
    pub rating: String,
    pub image_url: String,
    pub detail_url: String,
}

impl ItemRecord {
    /// Whether the record satisfies the field invariants downstream
    /// rendering relies on.
    pub fn is_well_formed(&self) -> bool {
        !self.title.is_empty()
            && !self.author.is_empty()
            && !self.price.is_empty()
            && !self.rating.is_empty()
            && !self.detail_url.is_empty()
            && is_absolute_http(&self.image_url)
    }
}

pub(crate) fn is_absolute_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
