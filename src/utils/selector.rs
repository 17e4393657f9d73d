//! CSS selector parsing utilities.

use scraper::Selector;

/// Parses a CSS selector with a safe fallback.
///
/// If parsing fails, logs an error and returns a selector that matches nothing
/// (`*:not(*)`), so a bad rule degrades to "field absent" instead of a panic.
///
/// # Arguments
///
/// * `selector_str` - The CSS selector string to parse
/// * `context` - Context description for error logging (e.g., "review count rule")
pub fn parse_selector_with_fallback(selector_str: &str, context: &str) -> Selector {
    Selector::parse(selector_str).unwrap_or_else(|e| {
        log::error!(
            "Failed to parse CSS selector '{}' in {}: {}. Using fallback selector.",
            selector_str,
            context,
            e
        );
        match Selector::parse("*:not(*)") {
            Ok(selector) => selector,
            Err(_) => unreachable!("'*:not(*)' is a valid selector"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_valid_selector_matches() {
        let doc = Html::parse_fragment(r#"<div class="sr_item">x</div>"#);
        let selector = parse_selector_with_fallback(".sr_item", "test");
        assert_eq!(doc.select(&selector).count(), 1);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = Html::parse_fragment(r#"<div class="sr_item">x</div>"#);
        let selector = parse_selector_with_fallback("div[[", "test");
        assert_eq!(doc.select(&selector).count(), 0);
    }
}
