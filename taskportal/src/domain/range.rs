use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const WORKDAYS_PER_WEEK: i64 = 5;
pub const MAX_DAYS_IN_MONTH: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Monday to Friday of the reference date's week.
    Week,
    /// Every calendar day of the reference date's month.
    Month,
}

impl RangeMode {
    /// The days covered by this mode around `reference`, in order.
    ///
    /// Weeks start on Sunday, so a Sunday reference date maps to the
    /// workweek that follows it.
    pub fn dates_for(&self, reference: NaiveDate) -> Vec<NaiveDate> {
        match self {
            RangeMode::Week => {
                let monday = week_monday(reference);
                (0..WORKDAYS_PER_WEEK)
                    .map(|offset| monday + Duration::days(offset))
                    .collect()
            }
            RangeMode::Month => (1..=MAX_DAYS_IN_MONTH)
                .filter_map(|day| {
                    NaiveDate::from_ymd_opt(reference.year(), reference.month(), day)
                })
                .collect(),
        }
    }
}

pub fn week_monday(reference: NaiveDate) -> NaiveDate {
    let sunday =
        reference - Duration::days(reference.weekday().num_days_from_sunday() as i64);
    sunday + Duration::days(1)
}

/// The workdays of the week before `today`'s week.
pub fn previous_workweek(today: NaiveDate) -> Vec<NaiveDate> {
    RangeMode::Week.dates_for(today - Duration::days(7))
}
