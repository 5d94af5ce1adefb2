use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Identifier the portal assigns to a saved activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActivityId(u64);

impl ActivityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActivityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

pub const MINUTE_STEP: u32 = 15;

/// One time entry, billable or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TaskRecord {
    pub activity_id: Option<ActivityId>,
    pub client_id: Option<u64>,
    pub client_name: Option<String>,
    pub project_id: Option<u64>,
    pub project_name: Option<String>,
    pub task_id: Option<u64>,
    pub task_name: Option<String>,
    pub is_billable: bool,
    pub date: NaiveDate,
    pub hours: u32,
    /// One of 0, 15, 30 or 45 once validated.
    pub minutes: u32,
    pub description: String,
}

impl TaskRecord {
    /// An empty draft for the given day.
    pub fn draft(date: NaiveDate) -> Self {
        Self {
            activity_id: None,
            client_id: None,
            client_name: None,
            project_id: None,
            project_name: None,
            task_id: None,
            task_name: None,
            is_billable: true,
            date,
            hours: 0,
            minutes: 0,
            description: String::new(),
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.hours as f64 + self.minutes as f64 / 60.0
    }

    pub fn set_time(&mut self, time: TrackedTime) {
        self.hours = time.hours;
        self.minutes = time.minutes;
    }

    /// Checks the minute granularity without touching the value.
    pub fn validate_minutes(&self) -> Result<(), ValidationError> {
        if self.minutes % MINUTE_STEP != 0 || self.minutes >= 60 {
            return Err(ValidationError::MinutesOutOfRange(self.minutes));
        }
        Ok(())
    }
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self::draft(chrono::Local::now().date_naive())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{0}' is not a number of hours")]
    NotANumber(String),
    #[error("hours cannot be negative")]
    Negative,
    #[error("a task cannot be longer than 24 hours")]
    TooLong,
    #[error("a task must be longer than 0 minutes")]
    Empty,
    #[error("Can only track tasks with the granularity of 15 minute increments")]
    NotQuarterHour,
    #[error("minutes must be one of 0, 15, 30 or 45, got {0}")]
    MinutesOutOfRange(u32),
}

/// Hours and minutes parsed from a decimal hours string such as `1.25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedTime {
    pub hours: u32,
    pub minutes: u32,
}

impl FromStr for TrackedTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: f64 = trimmed
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| ValidationError::NotANumber(trimmed.to_string()))?;

        if value < 0.0 {
            return Err(ValidationError::Negative);
        }
        if value > 24.0 {
            return Err(ValidationError::TooLong);
        }

        let exact_minutes = value * 60.0;
        let total_minutes = exact_minutes.round();
        if (exact_minutes - total_minutes).abs() > 1e-6 {
            return Err(ValidationError::NotQuarterHour);
        }

        let total_minutes = total_minutes as u32;
        if total_minutes == 0 {
            return Err(ValidationError::Empty);
        }
        if total_minutes % MINUTE_STEP != 0 {
            return Err(ValidationError::NotQuarterHour);
        }

        Ok(Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        })
    }
}
