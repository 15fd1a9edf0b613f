//! Flex Message composition - the Response Composer.
//!
//! One generic record-to-bubble mapping covers every card-rendering path;
//! callers only vary the alt text. The types mirror the subset of the LINE
//! Flex Message schema the bot actually emits.

use serde::Serialize;

use bookline_core::catalog::ItemRecord;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "flex")]
    Flex {
        #[serde(rename = "altText")]
        alt_text: String,
        contents: FlexContainer,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FlexContainer {
    #[serde(rename = "carousel")]
    Carousel { contents: Vec<Bubble> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bubble {
    #[serde(rename = "type")]
    kind: &'static str,
    hero: FlexComponent,
    body: FlexComponent,
    footer: FlexComponent,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FlexComponent {
    #[serde(rename = "box")]
    Box { layout: &'static str, contents: Vec<FlexComponent> },
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weight: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<&'static str>,
        wrap: bool,
    },
    #[serde(rename = "image")]
    Image {
        url: String,
        size: &'static str,
        #[serde(rename = "aspectRatio")]
        aspect_ratio: &'static str,
        #[serde(rename = "aspectMode")]
        aspect_mode: &'static str,
    },
    #[serde(rename = "button")]
    Button { style: &'static str, action: UriAction },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UriAction {
    #[serde(rename = "type")]
    kind: &'static str,
    label: &'static str,
    uri: String,
}

pub fn text_message(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Text { text: text.into() }
}

/// Renders up to the capped record count as a carousel of cards. The caller
/// guarantees the list is non-empty and within the cap; empty result sets
/// take the `text_message` path instead.
pub fn cards_message(records: &[ItemRecord], alt_text: &str) -> OutboundMessage {
    debug_assert!(!records.is_empty(), "empty result sets render as text, not cards");
    OutboundMessage::Flex {
        alt_text: alt_text.to_string(),
        contents: FlexContainer::Carousel { contents: records.iter().map(bubble).collect() },
    }
}

fn bubble(record: &ItemRecord) -> Bubble {
    Bubble {
        kind: "bubble",
        hero: FlexComponent::Image {
            url: record.image_url.clone(),
            size: "full",
            aspect_ratio: "20:13",
            aspect_mode: "cover",
        },
        body: FlexComponent::Box {
            layout: "vertical",
            contents: vec![
                FlexComponent::Text {
                    text: record.title.clone(),
                    weight: Some("bold"),
                    size: Some("md"),
                    color: None,
                    wrap: true,
                },
                baseline(FlexComponent::Text {
                    text: format!("ผู้แต่ง: {}", record.author),
                    weight: None,
                    size: Some("sm"),
                    color: Some("#999999"),
                    wrap: true,
                }),
                baseline(FlexComponent::Text {
                    text: format!("ราคา: {}", record.price),
                    weight: Some("bold"),
                    size: Some("md"),
                    color: Some("#1DB446"),
                    wrap: true,
                }),
                baseline(FlexComponent::Text {
                    text: format!("Rating: {}", record.rating),
                    weight: None,
                    size: Some("sm"),
                    color: Some("#FFCC00"),
                    wrap: true,
                }),
            ],
        },
        footer: FlexComponent::Box {
            layout: "vertical",
            contents: vec![FlexComponent::Button {
                style: "primary",
                action: UriAction {
                    kind: "uri",
                    label: "ดูสินค้า",
                    uri: record.detail_url.clone(),
                },
            }],
        },
    }
}

fn baseline(content: FlexComponent) -> FlexComponent {
    FlexComponent::Box { layout: "baseline", contents: vec![content] }
}
