//! Hotel detail page extraction.
//!
//! The structured-data block is the gate: a page without a parseable one
//! yields nothing. Everything else degrades to `None`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::primitives::{collapse_whitespace, extract_text, first_text};
use super::rooms::extract_rooms;
use super::rules::{DETAIL_STAR_RATING, HERO_IMAGE};
use crate::models::{Address, Coordinates, HotelDetailRecord};
use crate::utils::parse_selector_with_fallback;

static STRUCTURED_DATA: LazyLock<Selector> = LazyLock::new(|| {
    parse_selector_with_fallback(r#"script[type="application/ld+json"]"#, "structured data")
});
static HOTEL_NAME: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback("#hp_hotel_name", "hotel name"));
static HOTEL_TYPE: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hp__hotel-type-badge", "hotel type"));
static BREAKFAST: LazyLock<Selector> = LazyLock::new(|| {
    parse_selector_with_fallback(".ph-item-copy-breakfast-option", "breakfast option")
});
static DATE_SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".bui-date__subtitle", "check-in times"));

static MAP_COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%7c(-?\d+\.\d+),(-?\d+\.\d+)").expect("map coordinates pattern is valid")
});
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+:\d+").expect("clock time pattern is valid"));

/// Result of running the detail extractor over one page.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// No parseable structured-data block; the page produces no output.
    NoStructuredData,
    /// Aggregate rating missing or below the configured minimum.
    BelowMinScore { rating: Option<f64> },
    Record(Box<HotelDetailRecord>),
}

/// First JSON object in the page's structured-data block.
fn structured_data(doc: &Html) -> Option<Value> {
    let script = doc.select(&STRUCTURED_DATA).next()?;
    let raw: String = script.text().collect();
    match serde_json::from_str::<Value>(raw.trim()).ok()? {
        Value::Array(items) => items.into_iter().find(Value::is_object),
        value @ Value::Object(_) => Some(value),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        // addressCountry is sometimes a Country object.
        Value::Object(map) => map.get("name").and_then(as_string),
        _ => None,
    }
}

fn address(ld: &Value) -> Address {
    let Some(addr) = ld.get("address") else {
        return Address::default();
    };
    let field = |key: &str| addr.get(key).and_then(as_string);
    Address {
        full: field("streetAddress"),
        postal_code: field("postalCode"),
        locality: field("addressLocality"),
        country: field("addressCountry"),
        region: field("addressRegion"),
    }
}

fn coordinates(ld: &Value) -> Option<Coordinates> {
    let map = ld.get("hasMap")?.as_str()?;
    let captures = MAP_COORDINATES.captures(map)?;
    Some(Coordinates {
        lat: captures.get(1)?.as_str().parse().ok()?,
        lng: captures.get(2)?.as_str().parse().ok()?,
    })
}

/// Check-in and check-out times, read from the date subtitles. Both or neither.
fn check_times(doc: &Html) -> (Option<String>, Option<String>) {
    let times: Vec<String> = doc
        .select(&DATE_SUBTITLE)
        .filter_map(extract_text)
        .flat_map(|text| {
            CLOCK_TIME
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    match times.as_slice() {
        [check_in, check_out, ..] => (Some(check_in.clone()), Some(check_out.clone())),
        _ => (None, None),
    }
}

/// Extracts a hotel record from a detail page.
///
/// `url` is the record URL the caller derived from the resolved page URL.
/// With `min_score` set, a page whose aggregate rating is missing or lower is
/// skipped.
pub fn extract_detail(html: &str, url: &str, min_score: Option<f64>) -> DetailOutcome {
    let doc = Html::parse_document(html);
    let Some(ld) = structured_data(&doc) else {
        return DetailOutcome::NoStructuredData;
    };

    let aggregate = ld.get("aggregateRating");
    let rating = aggregate.and_then(|a| a.get("ratingValue")).and_then(as_f64);
    if let Some(min) = min_score {
        if !rating.is_some_and(|r| r >= min) {
            return DetailOutcome::BelowMinScore { rating };
        }
    }

    let root = doc.root_element();
    let name = first_text(root, &HOTEL_NAME)
        .map(|n| collapse_whitespace(&n))
        .or_else(|| ld.get("name").and_then(as_string))
        .unwrap_or_default();
    let (check_in, check_out) = check_times(&doc);

    DetailOutcome::Record(Box::new(HotelDetailRecord {
        url: url.to_string(),
        name,
        hotel_type: first_text(root, &HOTEL_TYPE),
        description: ld.get("description").and_then(as_string),
        star_rating: DETAIL_STAR_RATING.apply_u32(root),
        rating,
        review_count: aggregate.and_then(|a| a.get("reviewCount")).and_then(as_u32),
        breakfast_included: first_text(root, &BREAKFAST).map(|b| collapse_whitespace(&b)),
        check_in,
        check_out,
        coordinates: coordinates(&ld),
        address: address(&ld),
        hero_image: HERO_IMAGE.apply(root),
        rooms: extract_rooms(root),
    }))
}
