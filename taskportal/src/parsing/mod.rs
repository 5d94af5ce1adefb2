//! Pure functions turning portal markup into domain records.
//!
//! Nothing here does I/O. Missing or malformed nodes produce empty or default
//! values, the only exception being the date of a single activity, which
//! [`parse_activity_details`] reports as a [`MalformedMarkupError`].
//!
//! [`MalformedMarkupError`]: crate::MalformedMarkupError

mod activity_form;
mod calendar;

pub use activity_form::{parse_activity_details, parse_client_options};
pub use calendar::{parse_activity_ids_for_date, parse_tasks_for_date_range};

use scraper::{ElementRef, Selector};

/// Compiles a selector built at runtime, logging instead of failing.
fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

/// Text of the first child node, if that node is text.
fn first_text_child(element: &ElementRef) -> Option<String> {
    element
        .children()
        .next()
        .and_then(|node| node.value().as_text().map(|text| text.to_string()))
}

/// All text below the element, trimmed. `None` when empty.
fn inner_text(element: &ElementRef) -> Option<String> {
    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
