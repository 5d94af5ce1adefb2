use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::Html;

use crate::domain::{ActivityId, RangeMode, TaskRecord};

use super::{first_text_child, selector};

static ACTIVITY_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"edit\(event,\s*(\d+)\)").unwrap());

/// `Client Name - 7.75 hrs`
static CLIENT_AND_HOURS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)(?: - )+?(\d\d?)(\.\d\d?)? hrs").unwrap());

const BILLABLE_CLASS: &str = "foundBillableTime";

/// The `onclick` marker of a calendar cell, `popup(YYYY, M, D)`.
fn popup_marker(year: i32, month: u32, day: i64) -> String {
    format!("popup({}, {}, {})", year, month, day)
}

/// Ids of the activities booked on `date`.
///
/// The cell is looked up with `day - 1`, matching how the portal indexes its
/// calendar when the activity list is requested. Entries whose `onclick` has
/// no readable id are dropped.
pub fn parse_activity_ids_for_date(html: &str, date: NaiveDate) -> Vec<ActivityId> {
    let marker = popup_marker(date.year(), date.month(), date.day() as i64 - 1);
    let Some(entries) = selector(&format!(r#"td[onclick="{}"] p"#, marker)) else {
        return vec![];
    };

    let document = Html::parse_document(html);
    document
        .select(&entries)
        .filter_map(|entry| {
            let onclick = entry.value().attr("onclick").unwrap_or_default();
            let id = ACTIVITY_ID_PATTERN
                .captures(onclick)
                .and_then(|captures| captures.get(1))
                .and_then(|id| id.as_str().parse::<ActivityId>().ok());

            if id.is_none() {
                tracing::warn!(
                    "No activity id in calendar entry for {}: {:?}",
                    date,
                    onclick
                );
            }
            id
        })
        .collect()
}

/// Tasks shown in the calendar for each day of the range around `reference`.
///
/// Only `<p>` entries whose class starts with `found` count. An entry whose
/// text does not read `<client> - <hours> hrs` is kept with no client name
/// and zero time.
pub fn parse_tasks_for_date_range(
    html: &str,
    reference: NaiveDate,
    mode: RangeMode,
) -> Vec<TaskRecord> {
    let document = Html::parse_document(html);

    mode.dates_for(reference)
        .into_iter()
        .flat_map(|date| {
            let marker = popup_marker(date.year(), date.month(), date.day() as i64);
            let Some(entries) = selector(&format!(r#"td[onclick="{}"] p[class^="found"]"#, marker))
            else {
                return vec![];
            };

            document
                .select(&entries)
                .map(|entry| {
                    let text = first_text_child(&entry).unwrap_or_default();
                    let mut task = parse_calendar_entry(&text, date);
                    task.is_billable = entry.value().attr("class") == Some(BILLABLE_CLASS);
                    task
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn parse_calendar_entry(text: &str, date: NaiveDate) -> TaskRecord {
    let mut task = TaskRecord::draft(date);

    let Some(captures) = CLIENT_AND_HOURS_PATTERN.captures(text) else {
        tracing::debug!("Calendar entry on {} without hours: {:?}", date, text);
        return task;
    };

    task.client_name = captures.get(1).map(|m| m.as_str().trim().to_string());
    task.hours = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let fractional_hours = captures
        .get(3)
        .and_then(|m| format!("0{}", m.as_str()).parse::<f64>().ok())
        .unwrap_or(0.0);
    task.minutes = (fractional_hours * 60.0).round() as u32;

    task
}
