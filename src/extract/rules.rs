//! Named fallback chains.
//!
//! Markup varies between page variants, so each field is read by an ordered
//! list of strategies. The first strategy that yields a value wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::primitives::{extract_attribute, extract_numeric, extract_text};
use crate::utils::parse_selector_with_fallback;

static DIGIT_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s.,]+").expect("separator pattern is valid"));

#[derive(Debug, Clone)]
enum Source {
    Text,
    Attribute(&'static str),
    /// Serialized HTML of the scope itself, for values only found in scripts.
    Html,
}

/// One strategy of a chain.
#[derive(Debug, Clone)]
pub struct Step {
    selector: Option<Selector>,
    source: Source,
    strip_separators: bool,
    pattern: Option<Regex>,
}

impl Step {
    /// Text of the first element matching `css`.
    pub fn text(css: &str) -> Self {
        Self {
            selector: Some(parse_selector_with_fallback(css, "extraction rule")),
            source: Source::Text,
            strip_separators: false,
            pattern: None,
        }
    }

    /// Attribute `name` of the first element matching `css`.
    pub fn attr(css: &str, name: &'static str) -> Self {
        Self {
            selector: Some(parse_selector_with_fallback(css, "extraction rule")),
            source: Source::Attribute(name),
            strip_separators: false,
            pattern: None,
        }
    }

    /// The scope's own markup.
    pub fn html() -> Self {
        Self {
            selector: None,
            source: Source::Html,
            strip_separators: false,
            pattern: None,
        }
    }

    /// Drops whitespace, dots and commas before matching (`1.234 results` -> `1234results`).
    pub fn stripped(mut self) -> Self {
        self.strip_separators = true;
        self
    }

    /// Keeps only the match of `pattern`: its first capture group if it has one.
    pub fn matching(mut self, pattern: &str) -> Self {
        self.pattern = Regex::new(pattern).ok();
        if self.pattern.is_none() {
            log::error!("Invalid extraction pattern '{}'", pattern);
        }
        self
    }

    fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        let raw = match (&self.source, &self.selector) {
            (Source::Html, _) => Some(scope.html()),
            (Source::Text, Some(selector)) => scope.select(selector).next().and_then(extract_text),
            (Source::Attribute(name), Some(selector)) => scope
                .select(selector)
                .next()
                .and_then(|e| extract_attribute(e, name)),
            (_, None) => None,
        }?;
        let raw = if self.strip_separators {
            DIGIT_SEPARATORS.replace_all(&raw, "").into_owned()
        } else {
            raw
        };
        match &self.pattern {
            None => Some(raw),
            Some(pattern) => {
                let captures = pattern.captures(&raw)?;
                captures
                    .get(1)
                    .or_else(|| captures.get(0))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty())
            }
        }
    }
}

/// An ordered fallback chain for one field.
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    steps: Vec<Step>,
}

impl Rule {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
        Self { name, steps }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// First value any step yields under `scope`.
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        self.steps.iter().find_map(|step| step.apply(scope))
    }

    pub fn apply_u32(&self, scope: ElementRef<'_>) -> Option<u32> {
        self.apply(scope).as_deref().and_then(extract_numeric)
    }
}

/// Total number of results in a listing page header.
pub static RESULT_COUNT: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "result count",
        vec![
            Step::text(".sorth1").stripped().matching(r"\d+"),
            Step::text(".availability_nr").stripped().matching(r"\d+"),
            Step::text(".sr_header h1").stripped().matching(r"\d+"),
            Step::text(".sr_header h2").stripped().matching(r"\d+"),
            Step::text("#results_prev_next h4").stripped().matching(r"\d+"),
            Step::text("#sr-filter-descr").stripped().matching(r"(\d+)de"),
        ],
    )
});

/// Review count of a result card.
pub static REVIEW_COUNT: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "review count",
        vec![
            Step::text(".score_from_number_of_reviews").stripped().matching(r"\d+"),
            Step::text(".review-score-widget__subtext").stripped().matching(r"\d+"),
            Step::text(".bui-review-score__text").stripped().matching(r"\d+"),
        ],
    )
});

/// Star class of a result card, read from the star icon's class list.
pub static CARD_STAR_RATING: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "card star rating",
        vec![
            Step::attr("i.star_track svg", "class").matching(r"\d"),
            Step::attr(".star_track", "title").matching(r"\d"),
        ],
    )
});

/// Raw price text of a result card.
pub static CARD_PRICE: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "card price",
        vec![
            Step::text(".site_price:not(strong)"),
            Step::text(".totalPrice"),
            Step::text("strong.price"),
        ],
    )
});

/// Occupancy of a room row, from three possible text sources.
pub static ROOM_OCCUPANCY: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "room occupancy",
        vec![
            Step::text(".hprt-occupancy-occupancy-info .invisible_spoken").matching(r"\d+"),
            Step::attr(".hprt-occupancy-occupancy-info", "data-title").matching(r"\d+"),
            Step::text(".hprt-occupancy-occupancy-info").matching(r"\d+"),
        ],
    )
});

/// Star class on a detail page.
pub static DETAIL_STAR_RATING: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "detail star rating",
        vec![
            Step::attr("i.bk-icon-stars", "title").matching(r"\d"),
            Step::attr("[data-testid=\"rating-stars\"]", "aria-label").matching(r"\d"),
        ],
    )
});

/// Main photo of a detail page.
pub static HERO_IMAGE: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        "hero image",
        vec![
            Step::attr(".slick-track img", "src"),
            Step::attr("#photo_wrapper img", "src"),
            Step::html().matching(r"large_url: '([^']+)'"),
        ],
    )
});
