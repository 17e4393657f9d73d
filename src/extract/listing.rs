//! Search-results page extraction.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::primitives::{extract_attribute, extract_text, first_attribute, first_text};
use super::rules::{CARD_PRICE, CARD_STAR_RATING, RESULT_COUNT, REVIEW_COUNT};
use crate::models::{Coordinates, ListingRecord};
use crate::url_builder::strip_query;
use crate::utils::parse_selector_with_fallback;

static CARD: LazyLock<Selector> = LazyLock::new(|| parse_selector_with_fallback(".sr_item", "card"));
static ACTIVE_FILTER: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".filterelement.active", "active filter"));
static FILTER_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".filterelement", "filter link"));
static DETAIL_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hotel_name_link", "detail link"));
static CARD_NAME: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".sr-hotel__name", "card name"));
static CARD_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    parse_selector_with_fallback(".sr_item_photo_link.sr_hotel_preview_track", "card image")
});
static CARD_COORDS: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".district_link", "card coordinates"));
static ROOM_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".room_link", "room link"));
static OCCUPANCY_ICON: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".sr_max_occupancy i", "occupancy icon"));

static STYLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\((.*?)\)").expect("style url pattern is valid"));
static PRICE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("price pattern is valid"));
static PRICE_CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d.]+").expect("currency pattern is valid"));

/// A link found on a listing page, with its visible text.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    pub text: Option<String>,
    pub href: String,
}

/// Everything the listing handler needs from one search-results page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub total_results: Option<u32>,
    /// Whether a filter is already applied to this page.
    pub is_filtered: bool,
    pub filter_links: Vec<PageLink>,
    pub detail_links: Vec<PageLink>,
    /// One record per result card. `total_result_count` is left unset.
    pub cards: Vec<ListingRecord>,
}

impl ListingPage {
    /// Number of result pages for `page_size` cards per page.
    pub fn page_count(&self, page_size: u32) -> Option<u32> {
        let total = self.total_results?;
        Some(total.div_ceil(page_size.max(1)))
    }
}

fn links(doc: &Html, selector: &Selector) -> Vec<PageLink> {
    doc.select(selector)
        .filter_map(|link| {
            let href = extract_attribute(link, "href")?;
            Some(PageLink {
                text: extract_text(link),
                href,
            })
        })
        .collect()
}

/// Splits a rendered price like `€ 1,234` into amount and currency.
pub fn parse_price(raw: &str) -> (Option<f64>, Option<String>) {
    let compact: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let amount = PRICE_AMOUNT
        .find(&compact)
        .and_then(|m| m.as_str().parse().ok());
    let currency = PRICE_CURRENCY
        .find(&compact)
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty());
    (amount, currency)
}

fn absolute_url(href: &str, page_url: &str) -> Option<String> {
    let href = href.replace(['\n', '\r'], "");
    let href = href.trim();
    let resolved = match url::Url::parse(href) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => url::Url::parse(page_url).ok()?.join(href).ok()?,
        Err(_) => return None,
    };
    Some(strip_query(resolved.as_str()).to_string())
}

fn extract_card(card: ElementRef<'_>, page_url: &str) -> Option<ListingRecord> {
    let name = first_text(card, &CARD_NAME)?;
    let url = first_attribute(card, &DETAIL_LINK, "href").and_then(|h| absolute_url(&h, page_url))?;

    let rating = extract_attribute(card, "data-score")
        .and_then(|s| s.replace(',', ".").parse::<f64>().ok());
    let image = first_attribute(card, &CARD_IMAGE, "style").and_then(|style| {
        STYLE_URL
            .captures(&style)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '"').to_string())
    });
    let coordinates = first_attribute(card, &CARD_COORDS, "data-coords")
        .and_then(|raw| Coordinates::from_pair(&raw));
    let room_type = card
        .select(&ROOM_LINK)
        .next()
        .and_then(|link| link.text().map(str::trim).find(|t| !t.is_empty()))
        .map(str::to_string);
    let capacity = match card.select(&OCCUPANCY_ICON).count() {
        0 => None,
        n => u32::try_from(n).ok(),
    };
    let (price, currency) = match CARD_PRICE.apply(card) {
        Some(raw) => parse_price(&raw),
        None => (None, None),
    };

    Some(ListingRecord {
        url,
        name,
        rating,
        review_count: REVIEW_COUNT.apply_u32(card),
        star_rating: CARD_STAR_RATING.apply_u32(card),
        price,
        currency,
        room_type,
        capacity,
        coordinates,
        image,
        total_result_count: None,
    })
}

/// Parses a search-results page. Cards without a name or link are skipped.
pub fn extract_listing_page(html: &str, page_url: &str) -> ListingPage {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let cards = doc
        .select(&CARD)
        .filter_map(|card| {
            let record = extract_card(card, page_url);
            if record.is_none() {
                log::trace!("Skipping result card without name or link on {}", page_url);
            }
            record
        })
        .collect();

    ListingPage {
        total_results: RESULT_COUNT.apply_u32(root),
        is_filtered: doc.select(&ACTIVE_FILTER).next().is_some(),
        filter_links: links(&doc, &FILTER_LINK),
        detail_links: links(&doc, &DETAIL_LINK),
        cards,
    }
}

/// True once every result card shows a price (prices render after the cards).
pub fn all_cards_priced(html: &str) -> bool {
    let doc = Html::parse_document(html);
    doc.select(&CARD).all(|card| CARD_PRICE.apply(card).is_some())
}
