//! Streaming extraction of item records from storefront pages.
//!
//! The document is walked once with `lol_html` handlers in document order.
//! Every field is captured independently with its own fallback, so a
//! missing node never aborts the record, and a record list is produced even
//! from heavily degraded markup. Zero extracted records is a valid outcome,
//! distinct from a failed fetch.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use lol_html::{element, text, HtmlRewriter, Settings};
use tracing::debug;

use super::fetch::{FetchError, PageFetcher};
use super::record::{
    is_absolute_http, ItemRecord, FALLBACK_AUTHOR, FALLBACK_DETAIL_URL, FALLBACK_IMAGE_URL,
    FALLBACK_PRICE, FALLBACK_RATING, FALLBACK_TITLE,
};
use super::FetchRequest;

/// Hard cap on extracted records per document; document order decides which
/// containers survive the cut.
pub const MAX_RECORDS: usize = 5;

pub struct ExtractionPipeline {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
}

impl ExtractionPipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>) -> Self {
        Self { fetcher, base_url: base_url.into() }
    }

    /// Storefront root this pipeline is bound to; listing URLs for browse
    /// intents are derived from it.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the request's target page and extracts at most
    /// [`MAX_RECORDS`] item records in document order.
    pub async fn extract(&self, request: &FetchRequest) -> Result<Vec<ItemRecord>, FetchError> {
        let url = request.target_url(&self.base_url)?;
        let body = self.fetcher.fetch(&url).await?;
        let records = extract_records(&body, MAX_RECORDS);
        debug!(
            event_name = "catalog.extract.completed",
            url = %url,
            record_count = records.len(),
            "item records extracted"
        );
        Ok(records)
    }

    /// Fetches a detail page and pulls its synopsis text, when the page
    /// carries one.
    pub async fn synopsis(&self, detail_url: &str) -> Result<Option<String>, FetchError> {
        let url = reqwest::Url::parse(detail_url)
            .map_err(|error| FetchError::InvalidUrl(error.to_string()))?;
        let body = self.fetcher.fetch(&url).await?;
        Ok(extract_synopsis(&body))
    }
}

#[derive(Default)]
struct Draft {
    block: usize,
    title: Option<String>,
    // Set once a second title anchor shows up; only the first one counts.
    title_locked: bool,
    detail_url: Option<String>,
    author: Option<String>,
    price: Option<String>,
    image: Option<String>,
    rating: Option<String>,
}

impl Draft {
    fn finalize(self) -> ItemRecord {
        ItemRecord {
            title: text_or(self.title, FALLBACK_TITLE),
            author: text_or(self.author, FALLBACK_AUTHOR),
            price: text_or(self.price, FALLBACK_PRICE),
            rating: text_or(self.rating, FALLBACK_RATING),
            image_url: normalize_image_url(self.image),
            detail_url: text_or(self.detail_url, FALLBACK_DETAIL_URL),
        }
    }
}

fn text_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                fallback.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => fallback.to_string(),
    }
}

/// Downstream rendering requires an absolute address; anything relative,
/// empty, or otherwise malformed becomes the fixed placeholder cover.
fn normalize_image_url(value: Option<String>) -> String {
    match value {
        Some(url) if is_absolute_http(url.trim()) => url.trim().to_string(),
        _ => FALLBACK_IMAGE_URL.to_string(),
    }
}

#[derive(Default)]
struct ExtractState {
    drafts: Vec<Draft>,
    block: usize,
    pending_price: Option<String>,
    pending_image: Option<String>,
    done: bool,
}

impl ExtractState {
    fn current_draft(&mut self) -> Option<&mut Draft> {
        if self.done {
            return None;
        }
        self.drafts.last_mut()
    }
}

/// Single-pass record extraction. Pricing lives on the enclosing product
/// block (a `data-price` attribute), not on the item node itself - a layout
/// quirk of the source site that the handlers below preserve by tracking
/// block context across the linear walk.
pub(crate) fn extract_records(document: &str, limit: usize) -> Vec<ItemRecord> {
    if limit == 0 {
        return Vec::new();
    }

    let state = Rc::new(RefCell::new(ExtractState::default()));
    let block_state = Rc::clone(&state);
    let image_state = Rc::clone(&state);
    let container_state = Rc::clone(&state);
    let link_state = Rc::clone(&state);
    let title_state = Rc::clone(&state);
    let author_state = Rc::clone(&state);
    let rating_state = Rc::clone(&state);

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("[data-price]", move |el| {
                    {
                        let mut s = block_state.borrow_mut();
                        s.block += 1;
                        s.pending_price = el.get_attribute("data-price");
                        s.pending_image = None;
                    }
                    // The priced context ends with the element; nodes after
                    // the closing tag belong to no block and must fall back
                    // instead of inheriting this one's price or image.
                    if let Some(handlers) = el.end_tag_handlers() {
                        let end_state = Rc::clone(&block_state);
                        let handler: lol_html::EndTagHandler<'static> = Box::new(move |_end| {
                            let mut s = end_state.borrow_mut();
                            s.block += 1;
                            s.pending_price = None;
                            s.pending_image = None;
                            Ok(())
                        });
                        handlers.push(handler);
                    }
                    Ok(())
                }),
                element!(".item-img-block img", move |el| {
                    let mut s = image_state.borrow_mut();
                    if s.done {
                        return Ok(());
                    }
                    // Lazy-load value wins over the eager one.
                    let source = el.get_attribute("data-src").or_else(|| el.get_attribute("src"));
                    let block = s.block;
                    match s.drafts.last_mut() {
                        Some(draft) if draft.block == block && draft.image.is_none() => {
                            draft.image = source;
                        }
                        _ => s.pending_image = source,
                    }
                    Ok(())
                }),
                element!(".item-details", move |_el| {
                    let mut s = container_state.borrow_mut();
                    if s.done {
                        return Ok(());
                    }
                    if s.drafts.len() >= limit {
                        s.done = true;
                        return Ok(());
                    }
                    let draft = Draft {
                        block: s.block,
                        price: s.pending_price.clone(),
                        image: s.pending_image.take(),
                        ..Draft::default()
                    };
                    s.drafts.push(draft);
                    Ok(())
                }),
                element!(".item-details .txt-normal a", move |el| {
                    let mut s = link_state.borrow_mut();
                    let href = el.get_attribute("href");
                    if let Some(draft) = s.current_draft() {
                        if draft.detail_url.is_none() {
                            draft.detail_url = href;
                        }
                        if draft.title.is_none() {
                            draft.title = Some(String::new());
                        } else {
                            draft.title_locked = true;
                        }
                    }
                    Ok(())
                }),
                text!(".item-details .txt-normal a", move |chunk| {
                    let mut s = title_state.borrow_mut();
                    let fragment = chunk.as_str().to_string();
                    if let Some(draft) = s.current_draft() {
                        if !draft.title_locked {
                            if let Some(title) = draft.title.as_mut() {
                                title.push_str(&fragment);
                            }
                        }
                    }
                    Ok(())
                }),
                text!(".item-details .txt-light a", move |chunk| {
                    let mut s = author_state.borrow_mut();
                    let fragment = chunk.as_str().to_string();
                    if let Some(draft) = s.current_draft() {
                        draft.author.get_or_insert_with(String::new).push_str(&fragment);
                    }
                    Ok(())
                }),
                text!(".item-details span.vote-scores", move |chunk| {
                    let mut s = rating_state.borrow_mut();
                    let fragment = chunk.as_str().to_string();
                    if let Some(draft) = s.current_draft() {
                        draft.rating.get_or_insert_with(String::new).push_str(&fragment);
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |_chunk: &[u8]| {},
    );

    // Malformed markup degrades to whatever was collected before the
    // rewriter gave up; extraction itself never errors.
    match rewriter.write(document.as_bytes()) {
        Ok(()) => {
            let _ = rewriter.end();
        }
        Err(_) => drop(rewriter),
    }

    let mut collected = state.borrow_mut();
    collected.drafts.drain(..).take(limit).map(Draft::finalize).collect()
}

pub(crate) fn extract_synopsis(document: &str) -> Option<String> {
    let synopsis: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let handler_synopsis = Rc::clone(&synopsis);

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!(
                r#"meta[property="og:description"]"#,
                move |el| {
                    let mut slot = handler_synopsis.borrow_mut();
                    if slot.is_none() {
                        if let Some(content) = el.get_attribute("content") {
                            let trimmed = content.trim().to_string();
                            if !trimmed.is_empty() {
                                *slot = Some(trimmed);
                            }
                        }
                    }
                    Ok(())
                }
            )],
            ..Settings::default()
        },
        |_chunk: &[u8]| {},
    );

    match rewriter.write(document.as_bytes()) {
        Ok(()) => {
            let _ = rewriter.end();
        }
        Err(_) => drop(rewriter),
    }

    let result = synopsis.borrow_mut().take();
    result
}

#[cfg(test)]
mod tests {
    use crate::catalog::record::{
        FALLBACK_AUTHOR, FALLBACK_DETAIL_URL, FALLBACK_IMAGE_URL, FALLBACK_PRICE, FALLBACK_RATING,
        FALLBACK_TITLE,
    };

    use super::{extract_records, extract_synopsis, MAX_RECORDS};

    fn product_block(index: usize) -> String {
        format!(
            r#"<div class="product-item" data-price="{price}">
                 <div class="item-img-block">
                   <img src="https://cdn.example.com/covers/{index}.jpg"
                        data-src="https://cdn.example.com/lazy/{index}.jpg">
                 </div>
                 <div class="item-details">
                   <p class="txt-normal"><a href="https://www.naiin.com/product/{index}">เล่มที่ {index}</a></p>
                   <p class="txt-light"><a href="/author/{index}">ผู้เขียน {index}</a></p>
                   <span class="vote-scores">4.{index}</span>
                 </div>
               </div>"#,
            price = 100 + index,
            index = index,
        )
    }

    fn page_with(blocks: usize) -> String {
        let mut body = String::from("<html><body><div class='search-results'>");
        for index in 0..blocks {
            body.push_str(&product_block(index));
        }
        body.push_str("</div></body></html>");
        body
    }

    #[test]
    fn extracts_every_field_from_a_complete_container() {
        let records = extract_records(&page_with(1), MAX_RECORDS);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.title, "เล่มที่ 0");
        assert_eq!(record.author, "ผู้เขียน 0");
        assert_eq!(record.price, "100");
        assert_eq!(record.rating, "4.0");
        // Lazy-load attribute takes precedence over src.
        assert_eq!(record.image_url, "https://cdn.example.com/lazy/0.jpg");
        assert_eq!(record.detail_url, "https://www.naiin.com/product/0");
        assert!(record.is_well_formed());
    }

    #[test]
    fn caps_extraction_at_five_records_in_document_order() {
        let records = extract_records(&page_with(9), MAX_RECORDS);
        assert_eq!(records.len(), MAX_RECORDS);
        let titles: Vec<&str> = records.iter().map(|record| record.title.as_str()).collect();
        assert_eq!(titles, vec!["เล่มที่ 0", "เล่มที่ 1", "เล่มที่ 2", "เล่มที่ 3", "เล่มที่ 4"]);
    }

    #[test]
    fn zero_containers_yield_an_empty_list_not_an_error() {
        let records = extract_records("<html><body><p>no results</p></body></html>", MAX_RECORDS);
        assert!(records.is_empty());
    }

    #[test]
    fn a_container_with_every_field_missing_falls_back_per_field() {
        let document = r#"<div class="item-details"></div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.title, FALLBACK_TITLE);
        assert_eq!(record.author, FALLBACK_AUTHOR);
        assert_eq!(record.price, FALLBACK_PRICE);
        assert_eq!(record.rating, FALLBACK_RATING);
        assert_eq!(record.image_url, FALLBACK_IMAGE_URL);
        assert_eq!(record.detail_url, FALLBACK_DETAIL_URL);
        assert!(record.is_well_formed());
    }

    #[test]
    fn price_is_read_from_the_enclosing_block_not_the_item_node() {
        let document = r#"<div data-price="259">
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/x">X</a></p>
            </div>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records[0].price, "259");
    }

    #[test]
    fn a_container_outside_any_priced_block_does_not_inherit_the_previous_price() {
        let document = r#"<div data-price="100">
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/a">เล่ม ก</a></p>
            </div>
          </div>
          <div class="wrapper">
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/b">เล่ม ข</a></p>
            </div>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].price, "100");
        assert_eq!(records[1].price, FALLBACK_PRICE);
    }

    #[test]
    fn an_image_after_a_closed_block_is_not_attributed_to_the_previous_record() {
        let document = r#"<div data-price="100">
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/a">เล่ม ก</a></p>
            </div>
          </div>
          <div class="item-img-block"><img data-src="https://cdn.example.com/stray.jpg"></div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_url, FALLBACK_IMAGE_URL);
    }

    #[test]
    fn only_the_first_title_anchor_in_a_container_is_read() {
        let document = r#"<div class="item-details">
            <p class="txt-normal"><a href="https://www.naiin.com/product/1">เล่มหลัก</a></p>
            <p class="txt-normal"><a href="https://www.naiin.com/product/2">เล่มแถม</a></p>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "เล่มหลัก");
        assert_eq!(records[0].detail_url, "https://www.naiin.com/product/1");
    }

    #[test]
    fn eager_src_is_used_when_no_lazy_attribute_is_present() {
        let document = r#"<div data-price="120">
            <div class="item-img-block"><img src="https://cdn.example.com/eager.jpg"></div>
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/y">Y</a></p>
            </div>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records[0].image_url, "https://cdn.example.com/eager.jpg");
    }

    #[test]
    fn relative_image_addresses_are_replaced_with_the_placeholder() {
        let document = r#"<div data-price="120">
            <div class="item-img-block"><img data-src="/covers/relative.jpg"></div>
            <div class="item-details">
              <p class="txt-normal"><a href="https://www.naiin.com/product/z">Z</a></p>
            </div>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records[0].image_url, FALLBACK_IMAGE_URL);
    }

    #[test]
    fn containers_without_rating_elements_get_the_sentinel_for_every_record() {
        let mut body = String::new();
        for index in 0..3 {
            body.push_str(&format!(
                r#"<div data-price="1{index}">
                     <div class="item-details">
                       <p class="txt-normal"><a href="https://www.naiin.com/product/{index}">เล่ม {index}</a></p>
                     </div>
                   </div>"#,
            ));
        }
        let records = extract_records(&body, MAX_RECORDS);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.rating == FALLBACK_RATING));
    }

    #[test]
    fn empty_rating_text_degrades_to_the_sentinel() {
        let document = r#"<div class="item-details">
            <span class="vote-scores">   </span>
          </div>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert_eq!(records[0].rating, FALLBACK_RATING);
    }

    #[test]
    fn every_record_is_well_formed_even_on_degraded_markup() {
        let document = r#"<div class="item-details"><div class="item-details">
            <p class="txt-normal"><a>ไม่มีลิงก์</a>"#;
        let records = extract_records(document, MAX_RECORDS);
        assert!(!records.is_empty());
        assert!(records.iter().all(|record| record.is_well_formed()));
    }

    #[test]
    fn synopsis_reads_the_open_graph_description() {
        let document = r#"<html><head>
            <meta property="og:title" content="เล่มหนึ่ง">
            <meta property="og:description" content="  เรื่องราวของเด็กชายผู้รอดชีวิต  ">
          </head><body></body></html>"#;
        assert_eq!(
            extract_synopsis(document),
            Some("เรื่องราวของเด็กชายผู้รอดชีวิต".to_string())
        );
    }

    #[test]
    fn synopsis_is_none_when_the_page_carries_no_description() {
        assert_eq!(extract_synopsis("<html><head></head><body></body></html>"), None);
    }
}
