use std::{sync::Arc, time::Duration};

use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;

use crate::{
    domain::{ActivityId, Credentials, OptionRecord, RangeMode, TaskRecord},
    parsing, Method, PortalError, PortalRequest, PortalResponse, PortalUrl, ReqwestTransport,
    Transport, TransportError, Workstation,
};

/// Talks to the task tracking portal on behalf of one user at a time.
///
/// Every call takes the credentials explicitly; the client itself holds none.
#[derive(Clone)]
pub struct PortalClient {
    base_url: PortalUrl,
    workstation: Workstation,
    transport: Arc<dyn Transport>,
}

impl PortalClient {
    pub fn new(
        base_url: impl Into<String>,
        workstation: Workstation,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: PortalUrl::new(base_url),
            workstation,
            transport,
        }
    }

    /// A client using [`ReqwestTransport`].
    pub fn with_reqwest(
        base_url: impl Into<String>,
        workstation: Workstation,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::new(base_url, workstation, Arc::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_ref()
    }

    async fn send(
        &self,
        method: Method,
        url: PortalUrl,
        credentials: &Credentials,
        body: Option<String>,
    ) -> Result<PortalResponse, TransportError> {
        self.transport
            .send(PortalRequest {
                method,
                url: url.into(),
                credentials,
                workstation: &self.workstation,
                body,
            })
            .await
    }

    async fn fetch(&self, url: PortalUrl, credentials: &Credentials) -> Result<String, PortalError> {
        let url_string = url.as_ref().to_string();
        let resp = self.send(Method::Get, url, credentials, None).await?;

        match resp.status {
            401 | 403 => Err(PortalError::InvalidCredentials),
            status if status >= 400 => Err(PortalError::UnexpectedStatus {
                status,
                url: url_string,
            }),
            _ => Ok(resp.body),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: PortalUrl,
        credentials: &Credentials,
    ) -> Result<T, PortalError> {
        let url_string = url.as_ref().to_string();
        let body = self.fetch(url, credentials).await?;
        serde_json::from_str(&body).map_err(|source| PortalError::Json {
            url: url_string,
            source,
        })
    }

    /// Whether the portal accepts the credentials.
    ///
    /// A rejected login is `Ok(false)`; not reaching the portal is an error.
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    pub async fn check_login(&self, credentials: &Credentials) -> Result<bool, TransportError> {
        let resp = self
            .send(Method::Get, self.base_url.clone(), credentials, None)
            .await?;
        tracing::info!("Login check returned status {}", resp.status);
        Ok(resp.is_success())
    }

    /// Clients selectable on the "create activity" form for `date`.
    pub async fn list_clients(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<OptionRecord>, PortalError> {
        let html = self
            .fetch(self.base_url.create_activity(date), credentials)
            .await?;
        Ok(parsing::parse_client_options(&html))
    }

    pub async fn list_projects(
        &self,
        credentials: &Credentials,
        client_id: u64,
    ) -> Result<Vec<OptionRecord>, PortalError> {
        self.fetch_json(self.base_url.projects(client_id), credentials)
            .await
    }

    pub async fn list_tasks(
        &self,
        credentials: &Credentials,
        project_id: u64,
    ) -> Result<Vec<OptionRecord>, PortalError> {
        self.fetch_json(self.base_url.tasks(project_id), credentials)
            .await
    }

    /// Full details of one saved activity.
    pub async fn get_activity(
        &self,
        credentials: &Credentials,
        activity_id: ActivityId,
    ) -> Result<TaskRecord, PortalError> {
        let html = self
            .fetch(self.base_url.edit_activity(activity_id), credentials)
            .await?;
        Ok(parsing::parse_activity_details(&html, activity_id)?)
    }

    /// Every activity booked on `date`, in no particular order.
    ///
    /// Details are fetched concurrently; one failed fetch fails the whole call.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn get_daily_tasks(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<TaskRecord>, PortalError> {
        let html = self.fetch(self.base_url.calendar(date), credentials).await?;
        let activity_ids = parsing::parse_activity_ids_for_date(&html, date);
        tracing::debug!("Found {} activities", activity_ids.len());

        try_join_all(
            activity_ids
                .into_iter()
                .map(|activity_id| self.get_activity(credentials, activity_id)),
        )
        .await
    }

    /// Monday to Friday of the week around `date`.
    pub async fn get_weekly_tasks(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<TaskRecord>, PortalError> {
        self.get_tasks_for_range(credentials, date, RangeMode::Week)
            .await
    }

    pub async fn get_monthly_tasks(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
    ) -> Result<Vec<TaskRecord>, PortalError> {
        self.get_tasks_for_range(credentials, date, RangeMode::Month)
            .await
    }

    /// Reads the calendar page of every month the range touches. Each page
    /// only contributes days of its own month, so days shown greyed out on a
    /// neighbouring month's page are not counted twice.
    #[tracing::instrument(skip(self, credentials))]
    async fn get_tasks_for_range(
        &self,
        credentials: &Credentials,
        date: NaiveDate,
        mode: RangeMode,
    ) -> Result<Vec<TaskRecord>, PortalError> {
        let mut months: Vec<(i32, u32)> = Vec::new();
        for day in mode.dates_for(date) {
            if !months.contains(&(day.year(), day.month())) {
                months.push((day.year(), day.month()));
            }
        }

        let mut tasks = Vec::new();
        for (year, month) in months {
            let Some(page_date) = NaiveDate::from_ymd_opt(year, month, 1) else {
                continue;
            };
            let html = self
                .fetch(self.base_url.calendar(page_date), credentials)
                .await?;
            tasks.extend(
                parsing::parse_tasks_for_date_range(&html, date, mode)
                    .into_iter()
                    .filter(|task| task.date.year() == year && task.date.month() == month),
            );
        }

        Ok(tasks)
    }

    /// Creates the activity on the portal. `true` when the portal accepted it.
    ///
    /// Drafts missing a client, project or task, or with minutes off the
    /// quarter hour, are never sent.
    #[tracing::instrument(skip(self, credentials), fields(date = %task.date))]
    pub async fn submit_task(&self, credentials: &Credentials, task: &TaskRecord) -> bool {
        let body = match submit_form(task) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Refusing to submit task: {}", e);
                return false;
            }
        };

        let url = self.base_url.create_activity(task.date);
        match self.send(Method::Post, url, credentials, Some(body)).await {
            Ok(resp) if resp.status < 400 => true,
            Ok(resp) => {
                tracing::warn!("Submit returned status {}", resp.status);
                false
            }
            Err(e) => {
                tracing::warn!("Submit failed: {}", e);
                false
            }
        }
    }

    /// Deletes a saved activity. `true` when the portal accepted it.
    #[tracing::instrument(skip(self, credentials), fields(date = %task.date))]
    pub async fn delete_task(&self, credentials: &Credentials, task: &TaskRecord) -> bool {
        let Some(activity_id) = task.activity_id else {
            tracing::error!("Cannot delete a task without an activity id");
            return false;
        };

        let url = self.base_url.delete_activity(activity_id, task.date);
        match self.send(Method::Get, url, credentials, None).await {
            Ok(resp) if resp.status < 400 => true,
            Ok(resp) => {
                tracing::warn!("Delete of {} returned status {}", activity_id, resp.status);
                false
            }
            Err(e) => {
                tracing::warn!("Delete of {} failed: {}", activity_id, e);
                false
            }
        }
    }
}

/// The form body the "create activity" endpoint expects.
pub fn submit_form(task: &TaskRecord) -> Result<String, PortalError> {
    let client_id = task.client_id.ok_or(PortalError::MissingField("client"))?;
    let project_id = task.project_id.ok_or(PortalError::MissingField("project"))?;
    let task_id = task.task_id.ok_or(PortalError::MissingField("task"))?;
    task.validate_minutes()?;

    let date = format!(
        "{}/{}/{}",
        task.date.month(),
        task.date.day(),
        task.date.year()
    );

    Ok(format!(
        "client={}&project={}&task={}&date={}&activityDescription={}&hrs={}&min={}&billable={}",
        client_id,
        project_id,
        task_id,
        urlencoding::encode(&date),
        urlencoding::encode(&task.description),
        task.hours,
        task.minutes,
        task.is_billable
    ))
}
