//! Shared helpers.
//!
//! This module provides:
//! - Error retriability determination
//! - CSS selector parsing utilities

mod retry;
mod selector;

pub(crate) use retry::{is_requeueable_error, is_retriable_error};
pub use selector::parse_selector_with_fallback;
