use chrono::{Datelike, NaiveDate};

use crate::domain::ActivityId;

pub const DEFAULT_BASE_URL: &str = "https://xby2apps.xby2.com/TaskManagement/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrl(String);

impl AsRef<str> for PortalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<PortalUrl> for String {
    fn from(url: PortalUrl) -> Self {
        url.0
    }
}

impl PortalUrl {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    pub fn with_query(&self, key: &str, value: impl ToString) -> Self {
        let separator = if self.0.contains('?') { '&' } else { '?' };
        Self(format!(
            "{}{}{}={}",
            self.0,
            separator,
            key,
            urlencoding::encode(&value.to_string())
        ))
    }

    fn with_day(&self, date: NaiveDate) -> Self {
        self.with_query("year", date.year())
            .with_query("month", date.month())
            .with_query("day", date.day())
    }

    pub fn calendar(&self, date: NaiveDate) -> Self {
        self.append_path("Activity/Calendar")
            .with_query("year", date.year())
            .with_query("month", date.month())
    }

    pub fn create_activity(&self, date: NaiveDate) -> Self {
        self.append_path("Activity/Create").with_day(date)
    }

    pub fn projects(&self, client_id: u64) -> Self {
        self.append_path("Activity/GetProjects")
            .with_query("clientId", client_id)
    }

    pub fn tasks(&self, project_id: u64) -> Self {
        self.append_path("Activity/GetTasks")
            .with_query("projectId", project_id)
    }

    pub fn edit_activity(&self, activity_id: ActivityId) -> Self {
        self.append_path("Activity/Edit")
            .with_query("activityId", activity_id)
    }

    pub fn delete_activity(&self, activity_id: ActivityId, date: NaiveDate) -> Self {
        self.append_path("Activity/Delete")
            .with_query("activityId", activity_id)
            .with_day(date)
    }
}
