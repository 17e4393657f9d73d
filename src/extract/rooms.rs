//! Room inventory table of a detail page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::primitives::{collapse_whitespace, extract_text, first_text};
use super::rules::ROOM_OCCUPANCY;
use crate::models::RoomRecord;
use crate::utils::parse_selector_with_fallback;

static ROOM_ROW: LazyLock<Selector> = LazyLock::new(|| {
    parse_selector_with_fallback(
        ".hprt-table > tbody > tr:not(.hprt-cheapest-block-row)",
        "room row",
    )
});
static TYPE_CELL: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-table-cell-roomtype", "room type cell"));
static TYPE_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-roomtype-icon-link", "room type link"));
static BED_TYPE: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-roomtype-bed", "bed type"));
static FACILITY: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-facilities-facility", "room facility"));
static PRICE_CELL: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-price-price", "room price"));
static CONDITION: LazyLock<Selector> =
    LazyLock::new(|| parse_selector_with_fallback(".hprt-conditions li", "room condition"));

static PRICE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("room price pattern is valid"));
static PRICE_CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d.]+").expect("room currency pattern is valid"));
static SQUARE_FEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*ft²").expect("square feet pattern is valid"));

const SQUARE_METERS_PER_SQUARE_FOOT: f64 = 0.092903;

/// Room type, bed type and features from a row's type cell. Rows merged into
/// the cell above (rowspan) have no cell of their own and reuse the last one.
#[derive(Debug, Clone, Default)]
struct RoomTypeCell {
    room_type: Option<String>,
    bed_type: Option<String>,
    features: Vec<String>,
}

impl RoomTypeCell {
    fn parse(cell: ElementRef<'_>) -> Self {
        Self {
            room_type: first_text(cell, &TYPE_LINK),
            bed_type: first_text(cell, &BED_TYPE).map(|t| collapse_whitespace(&t)),
            features: cell
                .select(&FACILITY)
                .filter_map(extract_text)
                .map(|f| normalize_feature(&f))
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }
}

/// Trims the bullet marker and converts square feet to whole square meters.
pub fn normalize_feature(raw: &str) -> String {
    let text = raw.replacen('•', "", 1);
    let text = collapse_whitespace(&text);
    if let Some(feet) = SQUARE_FEET
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        let meters = (feet * SQUARE_METERS_PER_SQUARE_FOOT).floor();
        return format!("{meters} m²");
    }
    text
}

/// Amount and currency of a room price cell. Both must be present.
fn parse_room_price(raw: &str) -> Option<(f64, String)> {
    let compact: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let amount = PRICE_AMOUNT
        .find(&compact)
        .and_then(|m| m.as_str().parse::<f64>().ok())?;
    let currency = PRICE_CURRENCY.find(&compact)?.as_str().to_string();
    Some((amount, currency))
}

/// Every non-summary row of the room table under `scope`, in page order.
///
/// Rooms without a parsable price are kept with `available: false`.
pub fn extract_rooms(scope: ElementRef<'_>) -> Vec<RoomRecord> {
    let mut current = RoomTypeCell::default();
    let mut rooms = Vec::new();

    for row in scope.select(&ROOM_ROW) {
        if let Some(cell) = row.select(&TYPE_CELL).next() {
            current = RoomTypeCell::parse(cell);
        }

        let price = row
            .select(&PRICE_CELL)
            .next()
            .and_then(extract_text)
            .and_then(|raw| parse_room_price(&raw));
        let conditions = row
            .select(&CONDITION)
            .filter_map(extract_text)
            .map(|c| collapse_whitespace(&c))
            .collect();

        let mut room = RoomRecord {
            available: price.is_some(),
            room_type: current.room_type.clone(),
            bed_type: current.bed_type.clone(),
            capacity: ROOM_OCCUPANCY.apply_u32(row),
            price: None,
            currency: None,
            features: None,
            conditions,
        };
        if let Some((amount, currency)) = price {
            room.price = Some(amount);
            room.currency = Some(currency);
            room.features = Some(current.features.clone());
        }
        rooms.push(room);
    }
    rooms
}
