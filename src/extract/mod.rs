//! Tolerant page extraction.
//!
//! This module provides:
//! - Primitives that return `None` instead of failing
//! - Named fallback chains for fields whose markup varies
//! - Listing page, detail page and room table extractors
//!
//! Every function here is synchronous and works on an HTML snapshot, so no
//! parsed document is ever held across an await point.

mod detail;
mod listing;
mod primitives;
mod rooms;
mod rules;

pub use detail::{extract_detail, DetailOutcome};
pub use listing::{all_cards_priced, extract_listing_page, ListingPage};
pub use primitives::{poll_until, wait_for_selector};
