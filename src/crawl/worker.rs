//! Per-request processing and the worker loop.
//!
//! Every request ends in exactly one of: handled, one re-enqueue, or a
//! failure record.

use std::time::Instant;

use log::{debug, error, info, warn};

use super::context::CrawlContext;
use super::detail::handle_detail;
use super::listing::handle_listing;
use super::request::FetchRequest;
use super::router::{route, RouteDecision};
use crate::config::{MAX_CONSECUTIVE_QUEUE_ERRORS, QUEUE_IDLE_WAIT};
use crate::error_handling::{update_error_stats, ErrorType, FetchError};
use crate::session::BrowserSession;
use crate::utils::is_requeueable_error;

/// How a request left the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Handled,
    Requeued,
    Failed,
}

enum CycleResult {
    Accepted,
    Retired(String),
}

enum CycleError {
    Navigation(FetchError),
    Handler(anyhow::Error),
}

/// Navigate, route, handle. Runs inside the request timeout.
async fn run_cycle(
    ctx: &CrawlContext,
    session: &mut dyn BrowserSession,
    request: &FetchRequest,
) -> Result<CycleResult, CycleError> {
    session
        .goto(&request.url)
        .await
        .map_err(CycleError::Navigation)?;
    let resolved = session
        .current_url()
        .unwrap_or(request.url.as_str())
        .to_string();

    let label = match route(&ctx.config, request, &resolved) {
        RouteDecision::Accept(label) => label,
        RouteDecision::Retire { reason } => return Ok(CycleResult::Retired(reason)),
    };
    let session: &dyn BrowserSession = session;
    let handled = if label.is_listing() {
        handle_listing(ctx, session, request, &resolved).await
    } else {
        handle_detail(ctx, session, &resolved).await
    };
    handled.map_err(CycleError::Handler)?;
    Ok(CycleResult::Accepted)
}

/// Re-enqueues after a failure, or writes the failure record once the
/// request is out of retries.
async fn retry_or_fail(ctx: &CrawlContext, request: &FetchRequest, message: String) -> RequestOutcome {
    if request.retry_count < ctx.config.max_request_retries {
        let retry = request.retry_after_failure(message.clone());
        if ctx.requeue(retry).await {
            debug!(
                "Re-enqueued {} (retry {}): {}",
                request.url,
                request.retry_count + 1,
                message
            );
            return RequestOutcome::Requeued;
        }
    }
    let mut errors = request.error_messages.clone();
    errors.push(message);
    ctx.fail(request, errors).await;
    RequestOutcome::Failed
}

/// Processes one request through a validated session.
pub async fn process_request(ctx: &CrawlContext, request: FetchRequest) -> RequestOutcome {
    let started = Instant::now();
    let outcome = match ctx.sessions.acquire().await {
        Ok(mut session) => {
            let cycle = tokio::time::timeout(
                ctx.config.request_timeout(),
                run_cycle(ctx, session.as_mut(), &request),
            )
            .await;
            match cycle {
                Ok(Ok(CycleResult::Accepted)) => {
                    ctx.sessions.release(session).await;
                    RequestOutcome::Handled
                }
                Ok(Ok(CycleResult::Retired(reason))) => {
                    debug!("Session via {} retired: {}", session.proxy_identity(), reason);
                    ctx.sessions.retire(session).await;
                    if request.session_retries < ctx.config.max_session_retries {
                        if ctx.requeue(request.retry_after_invalid_session()).await {
                            RequestOutcome::Requeued
                        } else {
                            retry_or_fail(ctx, &request, reason).await
                        }
                    } else {
                        let message = format!(
                            "no working session after {} retries: {}",
                            request.session_retries, reason
                        );
                        let mut errors = request.error_messages.clone();
                        errors.push(message);
                        ctx.fail(&request, errors).await;
                        RequestOutcome::Failed
                    }
                }
                Ok(Err(CycleError::Navigation(e))) => {
                    update_error_stats(&ctx.stats, &e);
                    ctx.sessions.retire(session).await;
                    if is_requeueable_error(&e) {
                        retry_or_fail(ctx, &request, e.to_string()).await
                    } else {
                        let mut errors = request.error_messages.clone();
                        errors.push(e.to_string());
                        ctx.fail(&request, errors).await;
                        RequestOutcome::Failed
                    }
                }
                Ok(Err(CycleError::Handler(e))) => {
                    ctx.stats.increment_error(ErrorType::HandlerError);
                    warn!("Handler failed for {}: {:#}", request.url, e);
                    ctx.sessions.release(session).await;
                    retry_or_fail(ctx, &request, format!("{:#}", e)).await
                }
                Err(_) => {
                    ctx.stats.increment_error(ErrorType::RequestTimeout);
                    ctx.sessions.retire(session).await;
                    let message = format!(
                        "request timed out after {}s",
                        ctx.config.request_timeout().as_secs()
                    );
                    retry_or_fail(ctx, &request, message).await
                }
            }
        }
        Err(e) => {
            ctx.stats.increment_error(ErrorType::SessionAcquireError);
            warn!("No session for {}: {}", request.url, e);
            retry_or_fail(ctx, &request, e.to_string()).await
        }
    };

    if outcome == RequestOutcome::Handled {
        ctx.counters
            .handled
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
    if let Err(e) = ctx.queue.mark_handled(&request).await {
        warn!("Failed to mark {} handled: {}", request.url, e);
    }
    debug!(
        "{:?} {} in {:.2}s",
        outcome,
        request.url,
        started.elapsed().as_secs_f64()
    );
    outcome
}

/// Pulls requests until the queue is drained or migration is signalled.
pub async fn worker_loop(ctx: CrawlContext, worker_id: usize) {
    let mut queue_errors = 0u32;
    loop {
        if ctx.migration.is_cancelled() {
            info!("Worker {} stopping for migration", worker_id);
            break;
        }
        match ctx.queue.fetch_next().await {
            Ok(Some(request)) => {
                queue_errors = 0;
                process_request(&ctx, request).await;
            }
            Ok(None) => {
                queue_errors = 0;
                match ctx.queue.is_finished().await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => warn!("Worker {} could not check the queue: {}", worker_id, e),
                }
                // Another worker still has a request in flight that may enqueue more.
                tokio::select! {
                    _ = ctx.migration.cancelled() => {}
                    _ = tokio::time::sleep(QUEUE_IDLE_WAIT) => {}
                }
            }
            Err(e) => {
                queue_errors += 1;
                error!("Worker {} failed to read the queue: {}", worker_id, e);
                if queue_errors >= MAX_CONSECUTIVE_QUEUE_ERRORS {
                    error!(
                        "Worker {} giving up after {} consecutive queue errors",
                        worker_id, queue_errors
                    );
                    break;
                }
                tokio::time::sleep(QUEUE_IDLE_WAIT).await;
            }
        }
    }
    debug!("Worker {} finished", worker_id);
}
