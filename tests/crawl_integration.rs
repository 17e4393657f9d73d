//! End-to-end crawl tests against a mock origin.
//!
//! These tests drive `run_crawl` / `run_crawl_into` through real HTTP sessions
//! pointed at a `wiremock` server. No real network requests are made.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use booking_crawler::config::StartUrl;
use booking_crawler::models::OutputRecord;
use booking_crawler::{
    run_crawl, run_crawl_into, ConfigError, CrawlInput, MemorySink, OutputSink, StorageError,
};
use helpers::{detail_page, listing_page, read_jsonl, search_input, test_config, Card};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_search_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn one_card(total: u32) -> String {
    listing_page(
        total,
        &[Card {
            name: "Hotel Alpha",
            href: "/hotel/fr/alpha.html?label=gen173",
            score: Some("8.5"),
            price: Some("€ 120"),
        }],
    )
}

/// `offset` values of every search-results request the server saw, in order.
async fn search_offsets(server: &MockServer) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/searchresults.html")
        .map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

/// Sink whose first `failures` appends fail before it starts keeping records.
struct FlakySink {
    failures: AtomicUsize,
    inner: MemorySink,
}

impl FlakySink {
    fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            inner: MemorySink::new(),
        }
    }
}

#[async_trait]
impl OutputSink for FlakySink {
    async fn append(&self, record: OutputRecord) -> Result<(), StorageError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.append(record).await
    }
}

fn three_cards() -> String {
    listing_page(
        3,
        &[
            Card {
                name: "Hotel Alpha",
                href: "/hotel/fr/alpha.html?label=gen173",
                score: Some("8.5"),
                price: Some("€ 120"),
            },
            Card {
                name: "Hotel Beta",
                href: "/hotel/fr/beta.html?label=gen173",
                score: Some("7.0"),
                price: Some("€ 80"),
            },
            Card {
                name: "Hotel Gamma",
                href: "/hotel/fr/gamma.html?label=gen173",
                score: Some("9,1"),
                price: None,
            },
        ],
    )
}

#[tokio::test]
async fn test_simple_mode_filters_by_min_score() {
    let server = MockServer::start().await;
    mount_search_page(&server, three_cards()).await;
    let dir = TempDir::new().unwrap();

    let config = test_config(
        &server.uri(),
        dir.path(),
        CrawlInput {
            min_score: Some(8.0),
            ..search_input(true)
        },
    );
    let output_path = config.output_path.clone();
    let report = run_crawl(config).await.expect("crawl should succeed");

    assert_eq!(report.requests_handled, 1);
    assert_eq!(report.requests_failed, 0);
    assert_eq!(report.records_emitted, 2);
    assert_eq!(report.output_path.as_ref(), Some(&output_path));

    let records = read_jsonl(&output_path);
    assert_eq!(records.len(), 2);
    let alpha = records
        .iter()
        .find(|r| r["name"] == "Hotel Alpha")
        .expect("Alpha emitted");
    assert_eq!(alpha["rating"], 8.5);
    assert_eq!(alpha["price"], 120.0);
    assert_eq!(alpha["totalResultCount"], 3);
    let url = alpha["url"].as_str().unwrap();
    assert!(url.ends_with("/hotel/fr/alpha.html"), "{}", url);

    // Gamma's price never rendered; the record is still emitted with a null price.
    let gamma = records
        .iter()
        .find(|r| r["name"] == "Hotel Gamma")
        .expect("Gamma emitted");
    assert_eq!(gamma["rating"], 9.1);
    assert!(gamma["price"].is_null());

    assert!(records.iter().all(|r| r["name"] != "Hotel Beta"));
}

#[tokio::test]
async fn test_dedup_across_runs_via_state_file() {
    let server = MockServer::start().await;
    mount_search_page(&server, three_cards()).await;
    let dir = TempDir::new().unwrap();

    let first = run_crawl(test_config(&server.uri(), dir.path(), search_input(true)))
        .await
        .unwrap();
    assert_eq!(first.records_emitted, 3);
    assert!(dir.path().join("state.json").exists());

    let mut config = test_config(&server.uri(), dir.path(), search_input(true));
    config.output_path = dir.path().join("second.jsonl");
    let second = run_crawl(config).await.unwrap();
    assert_eq!(second.requests_handled, 1);
    assert_eq!(second.records_emitted, 0);
    assert!(read_jsonl(&dir.path().join("second.jsonl")).is_empty());
}

#[tokio::test]
async fn test_detail_mode_with_validated_sessions() {
    let server = MockServer::start().await;
    let listing = listing_page(
        2,
        &[
            Card {
                name: "Hotel Alpha",
                href: "/hotel/fr/alpha.html?label=gen173",
                score: Some("8.5"),
                price: Some("€ 120"),
            },
            Card {
                name: "Hotel Plain",
                href: "/hotel/fr/plain.html?label=gen173",
                score: Some("8.0"),
                price: Some("€ 90"),
            },
        ],
    );
    mount_search_page(&server, listing).await;
    Mock::given(method("GET"))
        .and(path("/hotel/fr/alpha.html"))
        .respond_with(html(detail_page("Hotel Alpha", "8,7")))
        .mount(&server)
        .await;
    // No structured data: the page is handled but produces nothing.
    Mock::given(method("GET"))
        .and(path("/hotel/fr/plain.html"))
        .respond_with(html(
            r#"<html><body><h2 id="hp_hotel_name">Hotel Plain</h2></body></html>"#.to_string(),
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = CrawlInput {
        validate_sessions: true,
        ..search_input(false)
    };
    let sink = Arc::new(MemorySink::new());
    let report = run_crawl_into(test_config(&server.uri(), dir.path(), input), sink.clone())
        .await
        .unwrap();

    assert_eq!(report.requests_handled, 3);
    assert_eq!(report.records_emitted, 1);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    match &records[0] {
        OutputRecord::Detail(hotel) => {
            assert_eq!(hotel.name, "Hotel Alpha");
            assert_eq!(hotel.rating, Some(8.7));
            assert_eq!(hotel.review_count, Some(310));
            assert_eq!(hotel.address.locality.as_deref(), Some("Paris"));
            assert!(hotel.url.ends_with("/hotel/fr/alpha.html"), "{}", hotel.url);
            assert_eq!(hotel.rooms.len(), 1);
            assert_eq!(hotel.rooms[0].capacity, Some(2));
            assert_eq!(hotel.rooms[0].price, Some(150.0));
        }
        other => panic!("expected a detail record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_session_is_retired_then_fails() {
    let server = MockServer::start().await;
    // The origin bounces every search to a page without the sort key.
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/blocked.html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blocked.html"))
        .respond_with(html("<html><body>Access denied</body></html>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let report = run_crawl_into(
        test_config(&server.uri(), dir.path(), search_input(true)),
        sink.clone(),
    )
    .await
    .unwrap();

    assert_eq!(report.requests_handled, 0);
    assert_eq!(report.requests_failed, 1);
    assert_eq!(report.retries, 2);
    assert_eq!(report.records_emitted, 0);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    match &records[0] {
        OutputRecord::Failure(failure) => {
            assert!(!failure.succeeded);
            assert!(failure.url.contains("searchresults.html"));
            assert!(failure
                .errors
                .last()
                .is_some_and(|e| e.contains("no working session")));
        }
        other => panic!("expected a failure record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_is_retried_then_recorded() {
    let server = MockServer::start().await;
    mount_search_page(
        &server,
        listing_page(
            1,
            &[Card {
                name: "Hotel Gone",
                href: "/hotel/fr/gone.html?label=gen173",
                score: Some("9.0"),
                price: Some("€ 100"),
            }],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/hotel/fr/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), search_input(false));
    let output_path = config.output_path.clone();
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.requests_handled, 1);
    assert_eq!(report.requests_failed, 1);
    assert_eq!(report.retries, 1);

    let records = read_jsonl(&output_path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["succeeded"], false);
    let errors = records[0]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_durable_queue_skips_handled_requests() {
    let server = MockServer::start().await;
    mount_search_page(&server, three_cards()).await;
    let dir = TempDir::new().unwrap();
    let queue_db = dir.path().join("queue.db");

    let mut config = test_config(&server.uri(), dir.path(), search_input(true));
    config.queue_db_path = Some(queue_db.clone());
    let first = run_crawl(config).await.unwrap();
    assert_eq!(first.requests_handled, 1);
    assert_eq!(first.records_emitted, 3);
    assert!(queue_db.exists());

    // Same queue, fresh dedup state: the start request is already handled.
    let mut config = test_config(&server.uri(), dir.path(), search_input(true));
    config.queue_db_path = Some(queue_db);
    config.state_path = dir.path().join("fresh_state.json");
    let second = run_crawl(config).await.unwrap();
    assert_eq!(second.requests_handled, 0);
    assert_eq!(second.records_emitted, 0);
}

#[tokio::test]
async fn test_failed_write_is_retried_without_losing_records() {
    let server = MockServer::start().await;
    mount_search_page(&server, one_card(1)).await;
    let dir = TempDir::new().unwrap();

    let mut config = test_config(&server.uri(), dir.path(), search_input(true));
    config.max_request_retries = 2;
    let sink = Arc::new(FlakySink::new(1));
    let report = run_crawl_into(config, sink.clone()).await.unwrap();

    assert_eq!(report.requests_handled, 1);
    assert_eq!(report.retries, 1);
    assert_eq!(report.requests_failed, 0);
    assert_eq!(report.records_emitted, 1);
    let records = sink.inner.records();
    assert_eq!(records.len(), 1);
    match &records[0] {
        OutputRecord::Listing(listing) => assert_eq!(listing.name, "Hotel Alpha"),
        other => panic!("expected a listing record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_first_page_enqueues_remaining_result_pages() {
    let server = MockServer::start().await;
    mount_search_page(&server, one_card(45)).await;
    let dir = TempDir::new().unwrap();

    let report = run_crawl(test_config(&server.uri(), dir.path(), search_input(true)))
        .await
        .unwrap();

    // ceil(45 / 20) = 3 pages; the offset pages do not paginate again.
    assert_eq!(report.requests_handled, 3);
    assert_eq!(report.requests_failed, 0);
    assert_eq!(report.records_emitted, 1);
    let mut offsets = search_offsets(&server).await;
    offsets.sort();
    assert_eq!(
        offsets,
        vec![None, Some("20".to_string()), Some("40".to_string())]
    );
}

#[tokio::test]
async fn test_max_pages_caps_seeded_pages() {
    let server = MockServer::start().await;
    mount_search_page(&server, one_card(45)).await;
    let dir = TempDir::new().unwrap();

    let input = CrawlInput {
        max_pages: Some(2),
        ..search_input(true)
    };
    let report = run_crawl(test_config(&server.uri(), dir.path(), input))
        .await
        .unwrap();

    assert_eq!(report.requests_handled, 2);
    let mut offsets = search_offsets(&server).await;
    offsets.sort();
    assert_eq!(offsets, vec![None, Some("20".to_string())]);
}

#[tokio::test]
async fn test_offset_start_url_is_not_paginated() {
    let server = MockServer::start().await;
    mount_search_page(&server, one_card(45)).await;
    let dir = TempDir::new().unwrap();

    let input = CrawlInput {
        start_urls: Some(vec![StartUrl::Url(format!(
            "{}/searchresults.html?ss=Paris&order=bayesian_review_score&rows=20&offset=20",
            server.uri()
        ))]),
        simple: true,
        validate_sessions: false,
        ..Default::default()
    };
    let report = run_crawl(test_config(&server.uri(), dir.path(), input))
        .await
        .unwrap();

    assert_eq!(report.requests_handled, 1);
    assert_eq!(search_offsets(&server).await, vec![Some("20".to_string())]);
}

#[tokio::test]
async fn test_filters_enqueue_one_request_per_filter() {
    let server = MockServer::start().await;
    let filtered = one_card(3).replace(
        "<body>",
        r#"<body><a class="filterelement active" href="/x">active</a><div id="sr-filter-descr">3 of 45</div>"#,
    );
    for value in ["stars5", "superb"] {
        Mock::given(method("GET"))
            .and(path("/searchresults.html"))
            .and(query_param("nflt", value))
            .respond_with(html(filtered.clone()))
            .mount(&server)
            .await;
    }
    let unfiltered = one_card(45).replace(
        "<body>",
        r#"<body>
        <a class="filterelement" href="/searchresults.html?ss=Paris&order=bayesian_review_score&nflt=stars5">5 stars</a>
        <a class="filterelement" href="/searchresults.html?ss=Paris&order=bayesian_review_score&nflt=superb">Superb: 9+</a>"#,
    );
    mount_search_page(&server, unfiltered).await;

    let dir = TempDir::new().unwrap();
    let queue_db = dir.path().join("queue.db");
    let input = CrawlInput {
        use_filters: true,
        ..search_input(true)
    };
    let mut config = test_config(&server.uri(), dir.path(), input);
    config.queue_db_path = Some(queue_db.clone());
    let report = run_crawl(config).await.unwrap();

    // Start page plus two filter pages; the unfiltered page does not paginate
    // and the filtered ones fit on a single page.
    assert_eq!(report.requests_handled, 3);
    assert_eq!(report.requests_failed, 0);
    assert!(search_offsets(&server).await.iter().all(Option::is_none));

    let pool = SqlitePool::connect_with(SqliteConnectOptions::new().filename(&queue_db))
        .await
        .unwrap();
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT unique_key, label, state FROM request_queue WHERE label = 'filterPage' ORDER BY unique_key",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    pool.close().await;

    let keys: Vec<&str> = rows.iter().map(|(key, _, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["5 stars_0", "Superb: 9+_0"]);
    assert!(rows.iter().all(|(_, _, state)| state == "handled"));
}

#[tokio::test]
async fn test_invalid_config_aborts_before_fetching() {
    let dir = TempDir::new().unwrap();
    let config = test_config(
        "http://127.0.0.1:9",
        dir.path(),
        CrawlInput {
            validate_sessions: false,
            ..Default::default()
        },
    );
    let err = run_crawl(config).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingSeed)
    ));
}
