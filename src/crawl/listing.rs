//! Listing page handler.

use anyhow::Result;
use log::{debug, info, warn};

use super::context::CrawlContext;
use super::request::{FetchRequest, Label};
use super::seed::pages_preseeded;
use crate::config::OutputMode;
use crate::error_handling::{InfoType, WarningType};
use crate::extract::{all_cards_priced, extract_listing_page, poll_until, ListingPage};
use crate::models::{ListingRecord, OutputRecord};
use crate::session::BrowserSession;
use crate::url_builder::{build_url, fix_link, has_query_key, with_offset};

/// Handles an accepted search-results page.
pub async fn handle_listing(
    ctx: &CrawlContext,
    session: &dyn BrowserSession,
    request: &FetchRequest,
    resolved_url: &str,
) -> Result<()> {
    let html = session.content().await?;
    let page = extract_listing_page(&html, resolved_url);
    let input = &ctx.config.input;
    debug!(
        "Listing {} ({:?}): {} cards, {:?} results, filtered={}",
        resolved_url,
        request.label(),
        page.cards.len(),
        page.total_results,
        page.is_filtered
    );

    let paginate = if input.use_filters {
        page.is_filtered
    } else {
        !pages_preseeded(&ctx.config)
    };
    if paginate {
        enqueue_pagination(ctx, &page, resolved_url).await?;
    }
    if input.use_filters && !page.is_filtered {
        enqueue_filters(ctx, &page, resolved_url).await?;
    }

    match ctx.config.output_mode() {
        OutputMode::Listing => emit_listings(ctx, session, page).await,
        OutputMode::Detail => {
            if !input.use_filters || page.is_filtered {
                enqueue_details(ctx, &page, resolved_url).await?;
            }
            Ok(())
        }
    }
}

/// Enqueues one `page` request per result page after the first. A page that
/// is itself a pagination result (has an offset) never paginates again.
async fn enqueue_pagination(ctx: &CrawlContext, page: &ListingPage, base_url: &str) -> Result<()> {
    if has_query_key(base_url, "offset") {
        return Ok(());
    }
    let page_size = ctx.config.page_size;
    let Some(mut count) = page.page_count(page_size) else {
        ctx.stats.increment_warning(WarningType::MissingResultCount);
        debug!("No result count on {}, not paginating", base_url);
        return Ok(());
    };
    if let Some(max_pages) = ctx.config.input.max_pages {
        count = count.min(max_pages);
    }
    if count > 1 {
        info!("Enqueuing {} pagination pages for {}", count - 1, base_url);
    }
    for index in 1..count {
        let url = with_offset(base_url, page_size, page_size * index);
        ctx.enqueue(FetchRequest::new(url, Label::Page)).await?;
    }
    Ok(())
}

/// Enqueues one `filterPage` request per filter control on an unfiltered page.
async fn enqueue_filters(ctx: &CrawlContext, page: &ListingPage, base_url: &str) -> Result<()> {
    for link in &page.filter_links {
        let Some(url) = fix_link(&link.href, base_url, &ctx.params) else {
            continue;
        };
        let key = format!("{}_0", link.text.as_deref().unwrap_or(&link.href));
        ctx.enqueue(FetchRequest::with_key(url, Label::FilterPage, key))
            .await?;
    }
    Ok(())
}

/// Enqueues each result's detail page, keyed by the hotel name.
async fn enqueue_details(ctx: &CrawlContext, page: &ListingPage, base_url: &str) -> Result<()> {
    let mut added = 0usize;
    for link in &page.detail_links {
        let Some(url) = fix_link(&link.href, base_url, &ctx.params) else {
            continue;
        };
        let key = link.text.clone().unwrap_or_else(|| url.clone());
        if ctx.enqueue(FetchRequest::with_key(url, Label::Detail, key)).await? {
            added += 1;
        }
    }
    debug!("Enqueued {} detail pages from {}", added, base_url);
    Ok(())
}

/// Keeps a card when it meets the minimum score. Without a minimum every card
/// passes, rated or not.
fn meets_min_score(record: &ListingRecord, min_score: Option<f64>) -> bool {
    match min_score {
        None => true,
        Some(min) => record.rating.is_some_and(|r| r >= min),
    }
}

/// Extracts listing records in-page and emits the ones not crawled before.
///
/// Prices render after the cards, so the DOM is re-read until every card has
/// one. On timeout the latest snapshot is used and missing prices stay null.
async fn emit_listings(
    ctx: &CrawlContext,
    session: &dyn BrowserSession,
    first: ListingPage,
) -> Result<()> {
    let resolved_url = session.current_url().unwrap_or_default().to_string();
    let page = if first.cards.iter().all(|c| c.price.is_some()) {
        first
    } else {
        let priced = poll_until(ctx.config.poll, move || async move {
            let html = session.content().await.ok()?;
            all_cards_priced(&html).then_some(html)
        })
        .await;
        match priced {
            Some(html) => extract_listing_page(&html, &resolved_url),
            None => {
                ctx.stats.increment_warning(WarningType::PriceNotRendered);
                debug!("Prices did not render on {}, emitting without", resolved_url);
                first
            }
        }
    };

    let input = &ctx.config.input;
    let mut claims = ctx.state.begin_claims();
    let mut records = Vec::new();
    for mut card in page.cards {
        if !meets_min_score(&card, input.min_score) {
            ctx.stats.increment_info(InfoType::BelowMinScore);
            continue;
        }
        if !claims.try_claim(&card.name) {
            ctx.stats.increment_info(InfoType::DuplicateSuppressed);
            continue;
        }
        card.url = build_url(&card.url, &ctx.params);
        if !input.use_filters {
            card.total_result_count = page.total_results;
        }
        ctx.stats.increment_info(InfoType::ListingRecordEmitted);
        records.push(OutputRecord::from(card));
    }

    // A failed or cancelled write drops `claims`, so a retry emits them again.
    ctx.emit(records).await?;
    claims.commit();

    if ctx.migration.is_cancelled() {
        if let Err(e) = ctx.state.persist().await {
            warn!("Failed to persist crawl state during migration: {}", e);
        }
    }
    Ok(())
}
