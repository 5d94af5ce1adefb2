//! Interactive flows: login, submitting a task, listing and deleting.
//!
//! Only one flow runs at a time. Each flow borrows the session for its whole
//! duration and keeps its own draft, so nothing leaks between invocations.

mod listing;
mod login;
mod submit;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskportal::{
    domain::{Credentials, UserSession},
    PortalClient, PortalError, TransportError,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{prompt::Prompt, status::StatusDisplay};

const BUSY_MESSAGE: &str = "Another task tracking command is already running";

/// How a flow ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    /// The user dismissed a prompt.
    Cancelled,
    /// The portal said no: bad credentials or a refused submission.
    Rejected,
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{}", BUSY_MESSAGE)]
    Busy,
    #[error("Could not reach the task tracking portal: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("No {0} available to choose from")]
    NothingToChoose(&'static str),
}

/// What a validation failure during a flow sends the user back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicy {
    /// Start over from date selection, keeping what was already answered.
    #[default]
    Flow,
    /// Ask the failed question again.
    Step,
}

#[derive(Default)]
pub struct SingleFlight {
    active: AtomicBool,
}

pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl SingleFlight {
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.active.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowSettings {
    pub retry_policy: RetryPolicy,
    pub default_username: Option<String>,
}

/// Runs the flows against one portal, one at a time, for the lifetime of the
/// process. The session lives here and nowhere else.
pub struct Orchestrator<P, S> {
    client: PortalClient,
    prompt: P,
    status: S,
    settings: WorkflowSettings,
    session: Mutex<UserSession>,
    flight: SingleFlight,
    today: Option<NaiveDate>,
}

impl<P: Prompt, S: StatusDisplay> Orchestrator<P, S> {
    pub fn new(client: PortalClient, prompt: P, status: S, settings: WorkflowSettings) -> Self {
        Self {
            client,
            prompt,
            status,
            settings,
            session: Mutex::new(UserSession::default()),
            flight: SingleFlight::default(),
            today: None,
        }
    }

    /// Pins "today", for reproducible date pickers.
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    async fn begin(&self) -> Result<FlightGuard<'_>, FlowError> {
        match self.flight.try_acquire() {
            Some(guard) => Ok(guard),
            None => {
                self.prompt.show_error(BUSY_MESSAGE).await;
                Err(FlowError::Busy)
            }
        }
    }

    /// Asks for credentials and checks them with the portal.
    pub async fn login(&self) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let mut session = self.session.lock().await;
        self.run_login(&mut session).await
    }

    /// Walks the user through creating one task.
    pub async fn submit(&self, date: Option<NaiveDate>) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let mut session = self.session.lock().await;
        self.run_submit(&mut session, date).await
    }

    pub async fn show_status(&self) -> Result<FlowOutcome, FlowError> {
        let _flight = self.begin().await?;
        let session = self.session.lock().await;
        self.refresh_status(&session).await;
        Ok(FlowOutcome::Completed)
    }

    /// The action the status line currently offers.
    pub async fn status_action(&self) -> crate::status::StatusAction {
        let session = self.session.lock().await;
        crate::status::StatusLine::compute(&session, &[]).action
    }

    /// Next shell line from the prompt.
    pub async fn read_command(&self) -> Option<String> {
        self.prompt.read_command().await
    }

    /// Forgets the credentials. Called on logout and on exit.
    pub async fn deactivate(&self) {
        let mut session = self.session.lock().await;
        session.clear();
        tracing::info!("Session cleared");
    }

    /// Valid credentials, logging in first when there are none.
    async fn ensure_login(
        &self,
        session: &mut UserSession,
    ) -> Result<Option<Credentials>, FlowError> {
        if session.valid_credentials().is_none() {
            let outcome = self.run_login(session).await?;
            if outcome != FlowOutcome::Completed {
                return Ok(None);
            }
        }
        Ok(session.valid_credentials().cloned())
    }

    /// Redraws the status line with this week's totals, when they can be read.
    async fn refresh_status(&self, session: &UserSession) {
        let weekly_tasks = match session.valid_credentials() {
            Some(credentials) => self
                .client
                .get_weekly_tasks(credentials, self.today())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Could not load this week's tasks: {}", e);
                    vec![]
                }),
            None => vec![],
        };
        self.status.render(session, &weekly_tasks);
    }

    /// Shows a portal failure. Rejected credentials invalidate the session.
    async fn report(&self, session: &mut UserSession, error: PortalError) -> FlowError {
        if matches!(error, PortalError::InvalidCredentials) {
            session.mark_checked(false);
            self.status.render(session, &[]);
        }
        self.prompt.show_error(&error.to_string()).await;
        FlowError::Portal(error)
    }
}
