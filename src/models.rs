//! Output records.
//!
//! Everything a run appends to the output sink. Field names serialize in
//! camelCase; a caller tells failures apart from hotels by the presence of
//! `succeeded`.

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Parses a `"lat,lng"` pair as found in `data-coords` attributes.
    pub fn from_pair(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',');
        let lat = parts.next()?.trim().parse().ok()?;
        let lng = parts.next()?.trim().parse().ok()?;
        Some(Self { lat, lng })
    }
}

/// Summary record extracted from one result card of a listing page.
///
/// Every field except `url` and `name` may be null; absence is a normal
/// outcome. Nulls are kept in the output so rows have a stable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub url: String,
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub star_rating: Option<u32>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub room_type: Option<String>,
    pub capacity: Option<u32>,
    pub coordinates: Option<Coordinates>,
    pub image: Option<String>,
    /// Total results reported by the page header. Only set for unfiltered runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_result_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub full: Option<String>,
    pub postal_code: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
}

/// One row of a detail page's room table.
///
/// `available` is false whenever no price could be parsed; such rooms carry
/// no price, currency or features but are still part of the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

/// Full hotel record extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetailRecord {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub hotel_type: Option<String>,
    pub description: Option<String>,
    pub star_rating: Option<u32>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    /// Breakfast option copy as shown on the page, when present.
    pub breakfast_included: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub address: Address,
    pub hero_image: Option<String>,
    pub rooms: Vec<RoomRecord>,
}

/// Terminal record for a request that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub succeeded: bool,
    pub errors: Vec<String>,
}

impl FailureRecord {
    pub fn new(url: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            url: url.into(),
            succeeded: false,
            errors,
        }
    }
}

/// Anything the crawl appends to the output sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Failure(FailureRecord),
    Detail(HotelDetailRecord),
    Listing(ListingRecord),
}

impl OutputRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutputRecord::Failure(_))
    }
}

impl From<ListingRecord> for OutputRecord {
    fn from(r: ListingRecord) -> Self {
        OutputRecord::Listing(r)
    }
}

impl From<HotelDetailRecord> for OutputRecord {
    fn from(r: HotelDetailRecord) -> Self {
        OutputRecord::Detail(r)
    }
}

impl From<FailureRecord> for OutputRecord {
    fn from(r: FailureRecord) -> Self {
        OutputRecord::Failure(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_from_pair() {
        assert_eq!(
            Coordinates::from_pair("48.8566,2.3522"),
            Some(Coordinates {
                lat: 48.8566,
                lng: 2.3522
            })
        );
        assert_eq!(Coordinates::from_pair("48.8566"), None);
        assert_eq!(Coordinates::from_pair("a,b"), None);
    }

    #[test]
    fn test_unavailable_room_omits_price_fields() {
        let room = RoomRecord {
            available: false,
            room_type: Some("Double Room".into()),
            bed_type: None,
            capacity: Some(2),
            price: None,
            currency: None,
            features: None,
            conditions: vec![],
        };
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"available": false, "roomType": "Double Room", "capacity": 2})
        );
    }

    #[test]
    fn test_listing_keeps_nulls() {
        let record = ListingRecord {
            url: "https://x.test/hotel/a.html".into(),
            name: "A".into(),
            rating: Some(8.5),
            review_count: None,
            star_rating: None,
            price: None,
            currency: None,
            room_type: None,
            capacity: None,
            coordinates: None,
            image: None,
            total_result_count: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["price"], serde_json::Value::Null);
        assert_eq!(json["reviewCount"], serde_json::Value::Null);
        assert!(json.get("totalResultCount").is_none());
    }

    #[test]
    fn test_failure_record_shape() {
        let record: OutputRecord =
            FailureRecord::new("https://x.test/", vec!["timeout".into()]).into();
        assert!(record.is_failure());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["errors"][0], "timeout");
    }
}
