//! Wishlist page extraction.
//!
//! Turns rendered wishlist markup into ordered [`ItemRecord`]s. The page is
//! recognised by its list-name marker; every `li` carrying an uppercase
//! alphanumeric `data-itemid` is an item container, ranked by its position
//! among the other containers.

mod error;

pub use error::{ItemError, ParseError};

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::models::{ItemRecord, Price};

static LIST_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#profile-list-name").unwrap());
static ITEM_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li[data-itemid]").unwrap());
static ITEM_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[id*="itemName_"]"#).unwrap());
static ITEM_REQUESTED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[id*="itemRequested_"]"#).unwrap());
static ITEM_PURCHASED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[id*="itemPurchased_"]"#).unwrap());
static ITEM_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9A-Z]+$").unwrap());

/// What to do when one item container on an otherwise valid page is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ItemPolicy {
    /// Skip the item and keep the rest of the page.
    #[default]
    Isolate,
    /// Abort the whole page on the first malformed item.
    Strict,
}

/// An item container that was dropped under [`ItemPolicy::Isolate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub rank: u32,
    pub item_id: String,
    pub reason: ItemError,
}

/// Everything extracted from one page.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub list_name: String,
    pub records: Vec<ItemRecord>,
    pub skipped: Vec<SkippedItem>,
}

/// Extract records with the default (isolating) item policy.
pub fn extract(markup: &str, timestamp: DateTime<Utc>) -> Result<PageExtraction, ParseError> {
    extract_with_policy(markup, timestamp, ItemPolicy::default())
}

/// Extract records from page markup.
///
/// Pure function of its inputs: no I/O, no clock.
pub fn extract_with_policy(
    markup: &str,
    timestamp: DateTime<Utc>,
    policy: ItemPolicy,
) -> Result<PageExtraction, ParseError> {
    let document = Html::parse_document(markup);

    let list_name = document
        .select(&LIST_NAME)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .ok_or(ParseError::ListNameNotFound)?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    let containers = document.select(&ITEM_CONTAINER).filter_map(|el| {
        el.value()
            .attr("data-itemid")
            .filter(|id| ITEM_ID.is_match(id))
            .map(|id| (el, id))
    });

    for (index, (container, item_id)) in containers.enumerate() {
        let rank = (index + 1) as u32;
        match parse_item(container) {
            Ok(fields) => records.push(ItemRecord {
                timestamp,
                list_name: list_name.clone(),
                rank,
                item_id: item_id.to_string(),
                item_name: fields.name,
                price: fields.price,
                requested: fields.requested,
                purchased: fields.purchased,
            }),
            Err(reason) => match policy {
                ItemPolicy::Strict => {
                    return Err(ParseError::MalformedItem {
                        rank,
                        item_id: item_id.to_string(),
                        source: reason,
                    });
                }
                ItemPolicy::Isolate => skipped.push(SkippedItem {
                    rank,
                    item_id: item_id.to_string(),
                    reason,
                }),
            },
        }
    }

    Ok(PageExtraction {
        list_name,
        records,
        skipped,
    })
}

struct ItemFields {
    name: String,
    price: Price,
    requested: u32,
    purchased: u32,
}

fn parse_item(container: ElementRef<'_>) -> Result<ItemFields, ItemError> {
    let name = container
        .select(&ITEM_NAME)
        .next()
        .ok_or(ItemError::MissingName)?
        .value()
        .attr("title")
        .ok_or(ItemError::MissingTitle)?
        .to_string();

    let requested = parse_count(container, &ITEM_REQUESTED, "requested")?;
    let purchased = parse_count(container, &ITEM_PURCHASED, "purchased")?;

    let price = match container.value().attr("data-price") {
        Some(raw) => Price::from_raw(raw).ok_or_else(|| ItemError::InvalidPrice(raw.to_string()))?,
        None => Price::Unknown,
    };

    Ok(ItemFields {
        name,
        price,
        requested,
        purchased,
    })
}

fn parse_count(
    container: ElementRef<'_>,
    selector: &Selector,
    field: &'static str,
) -> Result<u32, ItemError> {
    let text: String = container
        .select(selector)
        .next()
        .ok_or(ItemError::MissingCount(field))?
        .text()
        .collect();
    let value = text.trim();
    value.parse().map_err(|_| ItemError::InvalidCount {
        field,
        value: value.to_string(),
    })
}
