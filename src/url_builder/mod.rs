//! Canonical search and listing URLs.
//!
//! Builds seed URLs from the crawl input and rewrites discovered links so they
//! carry the same stay parameters (dates, currency, language, occupancy).
//! Everything here is pure string work; no I/O and no errors.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::CrawlInput;

static FRAGMENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[a-zA-Z_]+").expect("fragment pattern is valid"));
static REPEATED_AMPERSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&{2,}").expect("ampersand pattern is valid"));

/// Parses a stay date given as `MM-DD-YYYY`, `MM/DD/YYYY` or `YYYY-MM-DD`.
pub fn parse_stay_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%m-%d-%Y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Stay parameters every crawled URL must carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlParams {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub rooms: Option<u32>,
}

impl UrlParams {
    pub fn from_input(input: &CrawlInput) -> Self {
        // Dates only travel as a pair.
        let (check_in, check_out) = match (
            input.check_in.as_deref().and_then(parse_stay_date),
            input.check_out.as_deref().and_then(parse_stay_date),
        ) {
            (Some(ci), Some(co)) => (Some(ci), Some(co)),
            _ => (None, None),
        };
        Self {
            check_in,
            check_out,
            currency: input
                .currency
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_uppercase),
            language: input
                .language
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.replace('_', "-")),
            adults: input.adults.filter(|n| *n > 0),
            children: input.children.filter(|n| *n > 0),
            rooms: input.rooms.filter(|n| *n > 0),
        }
    }

    /// Parameters in the order they are appended. Each group is added only
    /// when its leading key is absent from the URL.
    fn groups(&self) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
        let mut groups = Vec::new();
        if let (Some(ci), Some(co)) = (self.check_in, self.check_out) {
            groups.push((
                "checkin_year_month_monthday",
                vec![(
                    "checkin_year_month_monthday",
                    ci.format("%Y-%m-%d").to_string(),
                )],
            ));
            groups.push((
                "checkout_year_month_monthday",
                vec![(
                    "checkout_year_month_monthday",
                    co.format("%Y-%m-%d").to_string(),
                )],
            ));
        }
        if let Some(currency) = &self.currency {
            groups.push((
                "selected_currency",
                vec![
                    ("selected_currency", currency.clone()),
                    ("changed_currency", "1".to_string()),
                    ("top_currency", "1".to_string()),
                ],
            ));
        }
        if let Some(language) = &self.language {
            groups.push(("lang", vec![("lang", language.clone())]));
        }
        if let Some(adults) = self.adults {
            groups.push(("group_adults", vec![("group_adults", adults.to_string())]));
        }
        if let Some(children) = self.children {
            groups.push((
                "group_children",
                vec![("group_children", children.to_string())],
            ));
        }
        if let Some(rooms) = self.rooms {
            groups.push(("no_rooms", vec![("no_rooms", rooms.to_string())]));
        }
        groups
    }
}

/// Splits `url` into (before-query, query, fragment-with-hash).
fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i + 1..], fragment),
        None => (rest, "", fragment),
    }
}

/// Keys present in a query string. Both `&` and `;` separate pairs.
fn query_keys(query: &str) -> Vec<&str> {
    query
        .split(['&', ';'])
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split('=').next().unwrap_or(pair))
        .collect()
}

/// Whether the URL's query already carries `key`.
pub fn has_query_key(url: &str, key: &str) -> bool {
    let (_, query, _) = split_url(url);
    query_keys(query).contains(&key)
}

/// Appends `pairs` to the query of `url`, keeping the existing query untouched.
fn append_pairs(url: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return url.to_string();
    }
    let (head, query, fragment) = split_url(url);
    let mut query = query.trim_end_matches('&').to_string();
    for (key, value) in pairs {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(key);
        query.push('=');
        query.push_str(value);
    }
    format!("{head}?{query}{fragment}")
}

/// Adds every stay parameter that is present in `params` and missing from `url`.
///
/// Idempotent: applying it to its own output changes nothing. User-supplied
/// query parameters keep their position and spelling.
pub fn build_url(url: &str, params: &UrlParams) -> String {
    let (_, query, _) = split_url(url);
    let existing = query_keys(query);
    let missing: Vec<(&str, String)> = params
        .groups()
        .into_iter()
        .filter(|(leading_key, _)| !existing.contains(leading_key))
        .flat_map(|(_, pairs)| pairs)
        .collect();
    let built = append_pairs(url, &missing);
    built.replace("?&", "?")
}

/// Canonical search-results URL for a destination query.
pub fn search_url(base_url: &str, query: &str, sort_by: &str, params: &UrlParams) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    let raw = format!(
        "{}/searchresults.html?dest_type=city;ss={}&order={}",
        base_url.trim_end_matches('/'),
        encoded,
        sort_by
    );
    build_url(&raw, params)
}

/// Adds the page size (`rows`) unless the URL already sets one.
pub fn with_rows(url: &str, page_size: u32) -> String {
    if has_query_key(url, "rows") {
        return url.to_string();
    }
    append_pairs(url, &[("rows", page_size.to_string())])
}

/// Listing URL for one results page: sets `rows` (when absent) and `offset`.
pub fn with_offset(url: &str, page_size: u32, offset: u32) -> String {
    let mut pairs = Vec::new();
    if !has_query_key(url, "rows") {
        pairs.push(("rows", page_size.to_string()));
    }
    if !has_query_key(url, "offset") {
        pairs.push(("offset", offset.to_string()));
    }
    append_pairs(url, &pairs)
}

/// Rewrites a link discovered on `page_url` into an absolute URL that carries
/// the run's stay parameters. Returns `None` for links that cannot be resolved.
pub fn fix_link(href: &str, page_url: &str, params: &UrlParams) -> Option<String> {
    let cleaned = href.replace(['\n', '\r'], "");
    let cleaned = FRAGMENT_TOKEN.replace_all(cleaned.trim(), "");
    if cleaned.is_empty() {
        return None;
    }
    let absolute = match url::Url::parse(&cleaned) {
        Ok(u) => u.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            url::Url::parse(page_url).ok()?.join(&cleaned).ok()?.to_string()
        }
        Err(_) => return None,
    };
    let built = build_url(&absolute, params);
    Some(REPEATED_AMPERSANDS.replace_all(&built, "&").replace("?&", "?"))
}

/// The URL without its query string and fragment.
pub fn strip_query(url: &str) -> &str {
    let (head, _, _) = split_url(url);
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_params() -> UrlParams {
        UrlParams::from_input(&CrawlInput {
            check_in: Some("03-10-2027".into()),
            check_out: Some("03/12/2027".into()),
            currency: Some("eur".into()),
            language: Some("en_gb".into()),
            adults: Some(2),
            children: Some(1),
            rooms: Some(1),
            ..Default::default()
        })
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_parse_stay_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2027, 3, 10).unwrap();
        assert_eq!(parse_stay_date("03-10-2027"), Some(expected));
        assert_eq!(parse_stay_date("03/10/2027"), Some(expected));
        assert_eq!(parse_stay_date("2027-03-10"), Some(expected));
        assert_eq!(parse_stay_date("13-40-2027"), None);
        assert_eq!(parse_stay_date("tomorrow"), None);
    }

    #[test]
    fn test_build_url_appends_all_params() {
        let url = build_url("https://www.booking.com/searchresults.html", &full_params());
        assert_eq!(
            url,
            "https://www.booking.com/searchresults.html?checkin_year_month_monthday=2027-03-10\
             &checkout_year_month_monthday=2027-03-12&selected_currency=EUR&changed_currency=1\
             &top_currency=1&lang=en-gb&group_adults=2&group_children=1&no_rooms=1"
        );
    }

    #[test]
    fn test_build_url_is_idempotent() {
        let params = full_params();
        let once = build_url("https://www.booking.com/hotel/fr/x.html?label=abc", &params);
        let twice = build_url(&once, &params);
        assert_eq!(once, twice);
        assert_eq!(count(&twice, "checkin_year_month_monthday="), 1);
        assert_eq!(count(&twice, "checkout_year_month_monthday="), 1);
        assert_eq!(count(&twice, "selected_currency="), 1);
        assert!(!twice.contains("?&"));
    }

    #[test]
    fn test_build_url_keeps_user_params_in_place() {
        let url = build_url(
            "https://www.booking.com/searchresults.html?dest_type=city;ss=Paris&order=price",
            &full_params(),
        );
        assert!(url.starts_with(
            "https://www.booking.com/searchresults.html?dest_type=city;ss=Paris&order=price&"
        ));
    }

    #[test]
    fn test_build_url_without_params_is_identity() {
        let url = "https://www.booking.com/searchresults.html?ss=Rome";
        assert_eq!(build_url(url, &UrlParams::default()), url);
    }

    #[test]
    fn test_build_url_trailing_question_mark() {
        let params = UrlParams {
            language: Some("de".into()),
            ..Default::default()
        };
        assert_eq!(
            build_url("https://x.test/a?", &params),
            "https://x.test/a?lang=de"
        );
    }

    #[test]
    fn test_build_url_keeps_fragment_last() {
        let params = UrlParams {
            rooms: Some(2),
            ..Default::default()
        };
        assert_eq!(
            build_url("https://x.test/a?b=1#tab", &params),
            "https://x.test/a?b=1&no_rooms=2#tab"
        );
    }

    #[test]
    fn test_only_one_date_is_dropped() {
        let params = UrlParams::from_input(&CrawlInput {
            check_in: Some("03-10-2027".into()),
            ..Default::default()
        });
        assert_eq!(params.check_in, None);
        assert_eq!(params.check_out, None);
    }

    #[test]
    fn test_search_url() {
        let url = search_url(
            "https://www.booking.com/",
            "New York",
            "bayesian_review_score",
            &UrlParams::default(),
        );
        assert_eq!(
            url,
            "https://www.booking.com/searchresults.html?dest_type=city;ss=New+York&order=bayesian_review_score"
        );
    }

    #[test]
    fn test_with_offset() {
        let base = "https://x.test/searchresults.html?ss=a";
        assert_eq!(
            with_offset(base, 20, 40),
            "https://x.test/searchresults.html?ss=a&rows=20&offset=40"
        );
        let sized = with_rows(base, 20);
        assert_eq!(sized, "https://x.test/searchresults.html?ss=a&rows=20");
        assert_eq!(with_rows(&sized, 50), sized);
        assert_eq!(
            with_offset(&sized, 20, 0),
            "https://x.test/searchresults.html?ss=a&rows=20&offset=0"
        );
    }

    #[test]
    fn test_fix_link_relative_and_fragment() {
        let params = UrlParams {
            currency: Some("USD".into()),
            ..Default::default()
        };
        let fixed = fix_link(
            "\n/hotel/fr/le-petit.html?label=gen1#hotelTmpl",
            "https://www.booking.com/searchresults.html?ss=Paris",
            &params,
        )
        .unwrap();
        assert_eq!(
            fixed,
            "https://www.booking.com/hotel/fr/le-petit.html?label=gen1&selected_currency=USD&changed_currency=1&top_currency=1"
        );
    }

    #[test]
    fn test_fix_link_rejects_garbage() {
        assert_eq!(fix_link("", "https://x.test/", &UrlParams::default()), None);
        assert_eq!(
            fix_link("http://[::1", "https://x.test/", &UrlParams::default()),
            None
        );
    }

    #[test]
    fn test_has_query_key_and_strip_query() {
        let url = "https://x.test/s.html?dest_type=city;ss=a&offset=20#top";
        assert!(has_query_key(url, "offset"));
        assert!(has_query_key(url, "ss"));
        assert!(!has_query_key(url, "rows"));
        assert_eq!(strip_query(url), "https://x.test/s.html");
    }
}
