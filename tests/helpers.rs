// Shared test helpers: configuration, HTML fixtures and output readers.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::path::{Path, PathBuf};
use std::time::Duration;

use booking_crawler::{Config, CrawlInput, PollPolicy};

/// A card on a search-results fixture page.
#[allow(dead_code)] // Used by other test files
pub struct Card<'a> {
    pub name: &'a str,
    pub href: &'a str,
    pub score: Option<&'a str>,
    pub price: Option<&'a str>,
}

/// Builds a search-results page with a result count header and the given cards.
#[allow(dead_code)]
pub fn listing_page(total: u32, cards: &[Card<'_>]) -> String {
    let mut body = format!(
        r#"<html><body><h1 class="sorth1">Paris: {} properties found</h1>"#,
        total
    );
    for card in cards {
        let score = card
            .score
            .map(|s| format!(r#" data-score="{}""#, s))
            .unwrap_or_default();
        let price = card
            .price
            .map(|p| format!(r#"<div class="totalPrice">{}</div>"#, p))
            .unwrap_or_default();
        body.push_str(&format!(
            r#"<div class="sr_item"{score}>
                <a class="hotel_name_link" href="{href}"><span class="sr-hotel__name">{name}</span></a>
                {price}
            </div>"#,
            score = score,
            href = card.href,
            name = card.name,
            price = price
        ));
    }
    body.push_str("</body></html>");
    body
}

/// Builds a hotel detail page with structured data and one priced room.
#[allow(dead_code)]
pub fn detail_page(name: &str, rating: &str) -> String {
    format!(
        r#"<html><head>
        <script type="application/ld+json">
        {{
            "@type": "Hotel",
            "name": "{name}",
            "description": "A test hotel.",
            "aggregateRating": {{"ratingValue": "{rating}", "reviewCount": 310}},
            "address": {{"addressLocality": "Paris", "addressCountry": "France"}}
        }}
        </script>
        </head><body>
        <h2 id="hp_hotel_name">{name}</h2>
        <table class="hprt-table"><tbody>
            <tr>
                <td class="hprt-table-cell-roomtype"><a class="hprt-roomtype-icon-link">Double Room</a></td>
                <td><div class="hprt-occupancy-occupancy-info" data-title="Max persons: 2"></div></td>
                <td><div class="hprt-price-price">€ 150</div></td>
            </tr>
        </tbody></table>
        </body></html>"#,
        name = name,
        rating = rating
    )
}

/// Configuration pointed at a mock origin, with every file under `dir` and
/// short timeouts so failing scenarios finish quickly.
#[allow(dead_code)]
pub fn test_config(base_url: &str, dir: &Path, input: CrawlInput) -> Config {
    Config {
        input: CrawlInput {
            concurrency: 2,
            ..input
        },
        base_url: base_url.to_string(),
        output_path: dir.join("out.jsonl"),
        state_path: dir.join("state.json"),
        queue_db_path: None,
        navigation_timeout_secs: 5,
        request_timeout_secs: 15,
        max_session_attempts: 3,
        max_request_retries: 1,
        max_session_retries: 2,
        poll: PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 2,
        },
        ..Default::default()
    }
}

/// Search input without session probing.
#[allow(dead_code)]
pub fn search_input(simple: bool) -> CrawlInput {
    CrawlInput {
        search: Some("Paris".to_string()),
        simple,
        validate_sessions: false,
        ..Default::default()
    }
}

/// Reads every JSON line of an output file.
#[allow(dead_code)]
pub fn read_jsonl(path: &PathBuf) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("output line is valid JSON"))
        .collect()
}
