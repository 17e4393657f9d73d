//! Detail page handler.

use std::sync::LazyLock;

use anyhow::Result;
use log::debug;
use scraper::Selector;

use super::context::CrawlContext;
use crate::error_handling::{InfoType, WarningType};
use crate::extract::{extract_detail, wait_for_selector, DetailOutcome};
use crate::models::OutputRecord;
use crate::session::BrowserSession;
use crate::url_builder::{build_url, strip_query};
use crate::utils::parse_selector_with_fallback;

static ROOM_OCCUPANCY: LazyLock<Selector> = LazyLock::new(|| {
    parse_selector_with_fallback(".hprt-occupancy-occupancy-info", "room occupancy")
});

/// Handles an accepted hotel detail page.
///
/// A page without structured data, or rated below the minimum, produces no
/// output and is not an error.
pub async fn handle_detail(
    ctx: &CrawlContext,
    session: &dyn BrowserSession,
    resolved_url: &str,
) -> Result<()> {
    // The room table renders late; carry on with whatever is there on timeout.
    let html = match wait_for_selector(session, &ROOM_OCCUPANCY, ctx.config.poll).await {
        Some(html) => html,
        None => session.content().await?,
    };

    let url = build_url(strip_query(resolved_url), &ctx.params);
    match extract_detail(&html, &url, ctx.config.input.min_score) {
        DetailOutcome::NoStructuredData => {
            ctx.stats
                .increment_warning(WarningType::MissingStructuredData);
            debug!("No structured data on {}, skipping", resolved_url);
            Ok(())
        }
        DetailOutcome::BelowMinScore { rating } => {
            ctx.stats.increment_info(InfoType::BelowMinScore);
            debug!("Rating {:?} below minimum on {}, skipping", rating, resolved_url);
            Ok(())
        }
        DetailOutcome::Record(record) => {
            for room in record.rooms.iter().filter(|r| !r.available) {
                ctx.stats.increment_warning(WarningType::UnavailableRoom);
                debug!("Room {:?} has no price on {}", room.room_type, url);
            }
            ctx.stats.increment_info(InfoType::DetailRecordEmitted);
            ctx.emit(vec![OutputRecord::from(*record)]).await
        }
    }
}
