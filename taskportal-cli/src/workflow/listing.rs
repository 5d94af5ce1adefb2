use chrono::{Datelike, NaiveDate};
use taskportal::domain::{RangeMode, TaskRecord, UserSession};

use super::{FlowError, FlowOutcome, Orchestrator};
use crate::{
    prompt::Prompt,
    status::{format_hours, hour_totals, StatusDisplay},
};

const DELETE: &str = "Delete";
const CANCEL: &str = "Cancel";

fn short_date(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

fn billability(task: &TaskRecord) -> &'static str {
    if task.is_billable {
        "billable"
    } else {
        "non-billable"
    }
}

/// One line per saved activity, as the edit form describes it.
fn activity_line(task: &TaskRecord) -> String {
    let id = task
        .activity_id
        .map(|id| format!("#{} ", id))
        .unwrap_or_default();
    format!(
        "{}{} / {} / {} {}:{:02} {} {}",
        id,
        task.client_name.as_deref().unwrap_or("?"),
        task.project_name.as_deref().unwrap_or("?"),
        task.task_name.as_deref().unwrap_or("?"),
        task.hours,
        task.minutes,
        billability(task),
        task.description
    )
    .trim_end()
    .to_string()
}

/// One line per calendar entry: `8/1 Tuesday Acme Insurance 2.5h billable`
fn calendar_line(task: &TaskRecord) -> String {
    format!(
        "{} {} {}h {}",
        task.date.format("%-m/%-d %A"),
        task.client_name.as_deref().unwrap_or_default(),
        format_hours(task.total_hours()),
        billability(task)
    )
}

impl<P: Prompt, S: StatusDisplay> Orchestrator<P, S> {
    /// Lists every activity saved on `date`.
    pub async fn show_day(&self, date: NaiveDate) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let mut session = self.session.lock().await;
        let Some(tasks) = self.load_day(&mut session, date).await? else {
            return Ok(FlowOutcome::Cancelled);
        };

        if tasks.is_empty() {
            self.prompt
                .show_info(&format!("No tasks on {}", short_date(date)))
                .await;
        }
        for task in &tasks {
            self.prompt.show_info(&activity_line(task)).await;
        }
        Ok(FlowOutcome::Completed)
    }

    /// Lists the calendar entries of the week or month around `date`, with totals.
    pub async fn show_range(
        &self,
        date: NaiveDate,
        mode: RangeMode,
    ) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let mut session = self.session.lock().await;
        let Some(credentials) = self.ensure_login(&mut session).await? else {
            return Ok(FlowOutcome::Cancelled);
        };

        let result = match mode {
            RangeMode::Week => self.client.get_weekly_tasks(&credentials, date).await,
            RangeMode::Month => self.client.get_monthly_tasks(&credentials, date).await,
        };
        let tasks: Vec<TaskRecord> = match result {
            Ok(tasks) => tasks
                .into_iter()
                .filter(|task| task.client_name.is_some())
                .collect(),
            Err(e) => return Err(self.report(&mut session, e).await),
        };

        for task in &tasks {
            self.prompt.show_info(&calendar_line(task)).await;
        }
        let (billable, non_billable) = hour_totals(&tasks);
        self.prompt
            .show_info(&format!(
                "Total: {}/{}h",
                format_hours(billable),
                format_hours(non_billable)
            ))
            .await;
        Ok(FlowOutcome::Completed)
    }

    /// Picks one of the activities saved on `date` and deletes it once confirmed.
    pub async fn delete(&self, date: NaiveDate) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let mut session = self.session.lock().await;
        let Some(tasks) = self.load_day(&mut session, date).await? else {
            return Ok(FlowOutcome::Cancelled);
        };

        if tasks.is_empty() {
            self.prompt
                .show_info(&format!("No tasks on {}", short_date(date)))
                .await;
            return Ok(FlowOutcome::Completed);
        }

        let labels: Vec<String> = tasks.iter().map(activity_line).collect();
        let Some(choice) = self
            .prompt
            .request_choice("Select Task To Delete", &labels)
            .await
        else {
            return Ok(FlowOutcome::Cancelled);
        };
        let Some(task) = labels
            .iter()
            .position(|label| *label == choice)
            .and_then(|i| tasks.get(i))
        else {
            return Ok(FlowOutcome::Cancelled);
        };

        let confirm = [DELETE.to_string(), CANCEL.to_string()];
        if self
            .prompt
            .request_choice(&format!("Delete '{}'?", choice), &confirm)
            .await
            .as_deref()
            != Some(DELETE)
        {
            return Ok(FlowOutcome::Cancelled);
        }

        let Some(credentials) = session.valid_credentials().cloned() else {
            return Ok(FlowOutcome::Cancelled);
        };
        if self.client.delete_task(&credentials, task).await {
            self.prompt
                .show_info(&format!("{} task was deleted", short_date(task.date)))
                .await;
            self.refresh_status(&session).await;
            Ok(FlowOutcome::Completed)
        } else {
            self.prompt
                .show_error("Task was not deleted, please try again")
                .await;
            Ok(FlowOutcome::Rejected)
        }
    }

    /// The day's activities, logging in first. `None` when the login did not
    /// go through.
    async fn load_day(
        &self,
        session: &mut UserSession,
        date: NaiveDate,
    ) -> Result<Option<Vec<TaskRecord>>, FlowError> {
        let Some(credentials) = self.ensure_login(session).await? else {
            return Ok(None);
        };

        match self.client.get_daily_tasks(&credentials, date).await {
            Ok(tasks) => Ok(Some(tasks)),
            Err(e) => Err(self.report(session, e).await),
        }
    }
}
