//! Page routing.
//!
//! Decides, before any extraction, whether a fetched page came through a
//! working session. Pages that did not are never handed to a handler.

use super::request::{FetchRequest, Label};
use crate::config::{Config, Seed, DETAIL_VALIDITY_MARKER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The page is genuine; run the handler for this label.
    Accept(Label),
    /// The session is suspect; retire it and re-enqueue the request.
    Retire { reason: String },
}

/// Routes a fetched page by its request label and resolved URL.
pub fn route(config: &Config, request: &FetchRequest, resolved_url: &str) -> RouteDecision {
    let label = request.label();

    // Explicit start URLs carry no marker we requested. A blocked session is
    // redirected somewhere shorter than the URL we asked for.
    if let Seed::StartUrls(_) = config.seed() {
        if resolved_url.len() < request.url.len() {
            return RouteDecision::Retire {
                reason: format!("resolved to shorter URL {}", resolved_url),
            };
        }
        return RouteDecision::Accept(label);
    }

    let marker = match label {
        Label::Detail => DETAIL_VALIDITY_MARKER,
        Label::Start | Label::Page | Label::FilterPage => config.input.sort_by.as_str(),
    };
    if resolved_url.contains(marker) {
        RouteDecision::Accept(label)
    } else {
        RouteDecision::Retire {
            reason: format!("'{}' missing from resolved URL {}", marker, resolved_url),
        }
    }
}
