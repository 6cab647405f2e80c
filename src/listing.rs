//! Listing-page helpers shared by the live hover path and the static scanner.

use crate::error::ParseError;
use crate::page::{DURATION_SELECTOR, IMAGE_SELECTOR, ITEM_SELECTOR, LINK_SELECTOR};
use crate::timecode::{parse_duration, sanitize_duration_text};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::warn;
use url::Url;

static ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse(ITEM_SELECTOR).unwrap());
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse(LINK_SELECTOR).unwrap());
static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse(IMAGE_SELECTOR).unwrap());
static DURATIONS: Lazy<Selector> = Lazy::new(|| Selector::parse(DURATION_SELECTOR).unwrap());

/// Absolute detail URL for an item's link `href`.
pub fn resolve_detail_url(href: Option<&str>, base: &Url) -> Result<String, ParseError> {
    let href = href
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(ParseError::MissingLink)?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ParseError::InvalidHref {
            href: href.to_string(),
            reason: e.to_string(),
        })
}

/// Seconds encoded in an item's duration badge, 0 when absent or unreadable.
pub fn duration_seconds(raw: Option<&str>) -> u64 {
    raw.map(|text| parse_duration(&sanitize_duration_text(text)))
        .unwrap_or(0)
}

/// One hoverable item found in a static listing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub detail_url: String,
    pub duration_secs: u64,
    pub thumbnail_src: Option<String>,
}

/// Items of a listing page, in document order. Items without a resolvable
/// link are skipped.
pub fn scan_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for item in document.select(&ITEMS) {
        let href = item
            .select(&LINKS)
            .next()
            .and_then(|link| link.value().attr("href"));
        let detail_url = match resolve_detail_url(href, base) {
            Ok(url) => url,
            Err(err) => {
                warn!("Skipping listing item: {err}");
                continue;
            }
        };
        let duration_text = item
            .select(&DURATIONS)
            .next()
            .map(|el| el.text().collect::<String>());
        let thumbnail_src = item
            .select(&IMAGES)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| base.join(src).ok())
            .map(String::from);

        entries.push(ListingEntry {
            detail_url,
            duration_secs: duration_seconds(duration_text.as_deref()),
            thumbnail_src,
        });
    }

    entries
}
