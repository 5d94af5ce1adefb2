use chrono::{Datelike, NaiveDate};
use taskportal::domain::{
    find_by_name, previous_workweek, Credentials, OptionRecord, TaskRecord, TrackedTime,
    UserSession,
};

use super::{FlowError, FlowOutcome, Orchestrator, RetryPolicy};
use crate::{
    prompt::Prompt,
    status::{format_hours, hour_totals, StatusDisplay},
};

const BILLABLE: &str = "billable";
const NON_BILLABLE: &str = "non-billable";
const NOT_CREATED_MESSAGE: &str = "Task was not created, please try again";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    AwaitingLogin,
    SelectingDate,
    SelectingClient,
    SelectingProject,
    SelectingTask,
    SelectingBillability,
    EnteringHours,
    EnteringDescription,
    Submitting,
    Done,
}

enum Step {
    Next(SubmitState),
    Cancelled,
    /// Back to date selection with the draft kept.
    Restart,
    Failed(FlowError),
}

/// Everything one submission has gathered so far.
struct SubmitFlow {
    draft: TaskRecord,
    date_is_given: bool,
    /// Set after a restart: answers already in the draft are not asked again.
    retained: bool,
    credentials: Option<Credentials>,
    clients: Vec<OptionRecord>,
    projects: Vec<OptionRecord>,
    tasks: Vec<OptionRecord>,
    outcome: FlowOutcome,
}

impl SubmitFlow {
    fn new(date: NaiveDate, date_is_given: bool) -> Self {
        Self {
            draft: TaskRecord::draft(date),
            date_is_given,
            retained: false,
            credentials: None,
            clients: vec![],
            projects: vec![],
            tasks: vec![],
            outcome: FlowOutcome::Completed,
        }
    }

    fn retained_name<'a>(&self, name: &'a Option<String>) -> Option<&'a str> {
        if self.retained {
            name.as_deref()
        } else {
            None
        }
    }
}

/// `8/1 Tuesday - 2.5/1h`
fn date_label(date: NaiveDate, booked: &[TaskRecord]) -> String {
    let on_date: Vec<TaskRecord> = booked.iter().filter(|t| t.date == date).cloned().collect();
    let (billable, non_billable) = hour_totals(&on_date);
    format!(
        "{} - {}/{}h",
        date.format("%-m/%-d %A"),
        format_hours(billable),
        format_hours(non_billable)
    )
}

fn created_message(task: &TaskRecord) -> String {
    format!(
        "{}/{} task was created with {}:{:02} {} hours",
        task.date.month(),
        task.date.day(),
        task.hours,
        task.minutes,
        if task.is_billable { BILLABLE } else { NON_BILLABLE }
    )
}

impl<P: Prompt, S: StatusDisplay> Orchestrator<P, S> {
    pub(super) async fn run_submit(
        &self,
        session: &mut UserSession,
        date: Option<NaiveDate>,
    ) -> Result<FlowOutcome, FlowError> {
        let mut flow = SubmitFlow::new(date.unwrap_or_else(|| self.today()), date.is_some());
        let mut state = SubmitState::AwaitingLogin;

        loop {
            tracing::debug!("Submit state {:?}", state);
            let step = match state {
                SubmitState::AwaitingLogin => match self.ensure_login(session).await {
                    Ok(Some(credentials)) => {
                        flow.credentials = Some(credentials);
                        Step::Next(SubmitState::SelectingDate)
                    }
                    Ok(None) => Step::Cancelled,
                    Err(e) => Step::Failed(e),
                },
                SubmitState::SelectingDate => self.select_date(&mut flow).await,
                SubmitState::SelectingClient => self.select_client(session, &mut flow).await,
                SubmitState::SelectingProject => self.select_project(session, &mut flow).await,
                SubmitState::SelectingTask => self.select_task(session, &mut flow).await,
                SubmitState::SelectingBillability => self.select_billability(&mut flow).await,
                SubmitState::EnteringHours => self.enter_hours(&mut flow).await,
                SubmitState::EnteringDescription => self.enter_description(&mut flow).await,
                SubmitState::Submitting => self.send_draft(session, &mut flow).await,
                SubmitState::Done => return Ok(flow.outcome),
            };

            state = match step {
                Step::Next(next) => next,
                Step::Cancelled => {
                    tracing::info!("Task submission cancelled");
                    return Ok(FlowOutcome::Cancelled);
                }
                Step::Restart => {
                    tracing::info!("Restarting task submission");
                    flow.retained = true;
                    SubmitState::SelectingDate
                }
                Step::Failed(e) => return Err(e),
            };
        }
    }

    /// Picks from `options`, reusing `retained` when it still names one of them.
    async fn choose(
        &self,
        label: &str,
        options: &[OptionRecord],
        retained: Option<&str>,
    ) -> Option<OptionRecord> {
        if let Some(found) = retained.and_then(|name| find_by_name(options, name)) {
            return Some(found.clone());
        }

        let names: Vec<String> = options.iter().map(|o| o.name.clone()).collect();
        let choice = self.prompt.request_choice(label, &names).await?;
        find_by_name(options, &choice).cloned()
    }

    async fn nothing_to_choose(&self, what: &'static str) -> Step {
        let error = FlowError::NothingToChoose(what);
        self.prompt.show_error(&error.to_string()).await;
        Step::Failed(error)
    }

    async fn select_date(&self, flow: &mut SubmitFlow) -> Step {
        if flow.date_is_given || flow.retained {
            return Step::Next(SubmitState::SelectingClient);
        }
        let Some(credentials) = flow.credentials.clone() else {
            return Step::Next(SubmitState::AwaitingLogin);
        };

        let days = previous_workweek(self.today());
        let booked = match days.first() {
            Some(monday) => self
                .client
                .get_weekly_tasks(&credentials, *monday)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Could not load last week's tasks: {}", e);
                    vec![]
                }),
            None => vec![],
        };

        let labels: Vec<String> = days.iter().map(|day| date_label(*day, &booked)).collect();
        let Some(choice) = self.prompt.request_choice("Select Date", &labels).await else {
            return Step::Cancelled;
        };

        flow.draft.date = labels
            .iter()
            .position(|label| *label == choice)
            .and_then(|i| days.get(i).copied())
            .unwrap_or_else(|| self.today());
        Step::Next(SubmitState::SelectingClient)
    }

    async fn select_client(&self, session: &mut UserSession, flow: &mut SubmitFlow) -> Step {
        let Some(credentials) = flow.credentials.clone() else {
            return Step::Next(SubmitState::AwaitingLogin);
        };

        flow.clients = match self.client.list_clients(&credentials, flow.draft.date).await {
            Ok(clients) => clients,
            Err(e) => return Step::Failed(self.report(session, e).await),
        };
        if flow.clients.is_empty() {
            return self.nothing_to_choose("clients").await;
        }

        let retained = flow.retained_name(&flow.draft.client_name);
        let Some(client) = self.choose("Select Client", &flow.clients, retained).await else {
            return Step::Cancelled;
        };

        flow.draft.client_id = Some(client.id);
        flow.draft.client_name = Some(client.name);
        Step::Next(SubmitState::SelectingProject)
    }

    async fn select_project(&self, session: &mut UserSession, flow: &mut SubmitFlow) -> Step {
        let (Some(credentials), Some(client_id)) = (flow.credentials.clone(), flow.draft.client_id)
        else {
            return Step::Next(SubmitState::SelectingClient);
        };

        flow.projects = match self.client.list_projects(&credentials, client_id).await {
            Ok(projects) => projects,
            Err(e) => return Step::Failed(self.report(session, e).await),
        };
        if flow.projects.is_empty() {
            return self.nothing_to_choose("projects").await;
        }

        let retained = flow.retained_name(&flow.draft.project_name);
        let Some(project) = self.choose("Select Project", &flow.projects, retained).await else {
            return Step::Cancelled;
        };

        flow.draft.project_id = Some(project.id);
        flow.draft.project_name = Some(project.name);
        Step::Next(SubmitState::SelectingTask)
    }

    async fn select_task(&self, session: &mut UserSession, flow: &mut SubmitFlow) -> Step {
        let (Some(credentials), Some(project_id)) =
            (flow.credentials.clone(), flow.draft.project_id)
        else {
            return Step::Next(SubmitState::SelectingProject);
        };

        flow.tasks = match self.client.list_tasks(&credentials, project_id).await {
            Ok(tasks) => tasks,
            Err(e) => return Step::Failed(self.report(session, e).await),
        };
        if flow.tasks.is_empty() {
            return self.nothing_to_choose("tasks").await;
        }

        let retained = flow.retained_name(&flow.draft.task_name);
        let Some(task) = self.choose("Select Task", &flow.tasks, retained).await else {
            return Step::Cancelled;
        };

        flow.draft.task_id = Some(task.id);
        flow.draft.task_name = Some(task.name);
        Step::Next(SubmitState::SelectingBillability)
    }

    async fn select_billability(&self, flow: &mut SubmitFlow) -> Step {
        if flow.retained {
            return Step::Next(SubmitState::EnteringHours);
        }

        let options = [BILLABLE.to_string(), NON_BILLABLE.to_string()];
        let Some(choice) = self
            .prompt
            .request_choice("Is the task billable?", &options)
            .await
        else {
            return Step::Cancelled;
        };

        flow.draft.is_billable = choice == BILLABLE;
        Step::Next(SubmitState::EnteringHours)
    }

    async fn enter_hours(&self, flow: &mut SubmitFlow) -> Step {
        let Some(answer) = self
            .prompt
            .request_text("Select Hours (accepts decimals .25, .5, .75)", false)
            .await
        else {
            return Step::Cancelled;
        };

        match answer.parse::<TrackedTime>() {
            Ok(time) => {
                flow.draft.set_time(time);
                Step::Next(SubmitState::EnteringDescription)
            }
            Err(e) => {
                tracing::info!("Rejected hours {:?}: {}", answer, e);
                self.prompt.show_error(&e.to_string()).await;
                match self.settings.retry_policy {
                    RetryPolicy::Flow => Step::Restart,
                    RetryPolicy::Step => Step::Next(SubmitState::EnteringHours),
                }
            }
        }
    }

    async fn enter_description(&self, flow: &mut SubmitFlow) -> Step {
        let Some(description) = self.prompt.request_text("What did you do?", false).await else {
            return Step::Cancelled;
        };

        flow.draft.description = description;
        Step::Next(SubmitState::Submitting)
    }

    async fn send_draft(&self, session: &mut UserSession, flow: &mut SubmitFlow) -> Step {
        let Some(credentials) = flow.credentials.clone() else {
            return Step::Next(SubmitState::AwaitingLogin);
        };

        if self.client.submit_task(&credentials, &flow.draft).await {
            tracing::info!("Task created for {}", flow.draft.date);
            self.prompt.show_info(&created_message(&flow.draft)).await;
            self.refresh_status(session).await;
            flow.outcome = FlowOutcome::Completed;
        } else {
            self.prompt.show_error(NOT_CREATED_MESSAGE).await;
            flow.outcome = FlowOutcome::Rejected;
        }
        Step::Next(SubmitState::Done)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taskportal::{testing::FakeTransport, Method, PortalError};

    use super::*;
    use crate::workflow::testing::*;

    const AUGUST_2017: &str = include_str!("../../../taskportal/fixtures/calendar_august_2017.html");
    const CREATE_ACTIVITY: &str =
        include_str!("../../../taskportal/fixtures/create_activity.html");
    const PROJECTS: &str = r#"[{"Id":2001,"Name":"Policy Admin Modernization"}]"#;
    const TASKS: &str = r#"[{"Id":31,"Name":"Development"},{"Id":32,"Name":"Meetings"}]"#;

    fn portal() -> FakeTransport {
        FakeTransport::new()
            .on(Method::Get, "TaskManagement/", 200, "")
            .on(Method::Get, "Activity/Calendar", 200, AUGUST_2017)
            .on(Method::Get, "Activity/Create", 200, CREATE_ACTIVITY)
            .on(Method::Get, "GetProjects?clientId=101", 200, PROJECTS)
            .on(Method::Get, "GetTasks?projectId=2001", 200, TASKS)
            .on(Method::Post, "Activity/Create", 302, "")
    }

    fn create_form_requests(transport: &FakeTransport) -> usize {
        transport
            .requests()
            .iter()
            .filter(|r| r.method == Method::Get && r.url.contains("Activity/Create"))
            .count()
    }

    fn posted_bodies(transport: &FakeTransport) -> Vec<String> {
        transport
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .filter_map(|r| r.body)
            .collect()
    }

    #[test]
    fn date_labels_show_booked_hours() {
        let august_first = NaiveDate::from_ymd_opt(2017, 8, 1).unwrap();
        let booked = taskportal::parsing::parse_tasks_for_date_range(
            AUGUST_2017,
            august_first,
            taskportal::domain::RangeMode::Week,
        );

        assert_eq!(date_label(august_first, &booked), "8/1 Tuesday - 2.5/1h");
        assert_eq!(
            date_label(NaiveDate::from_ymd_opt(2017, 7, 31).unwrap(), &booked),
            "7/31 Monday - 0/0h"
        );
    }

    #[tokio::test]
    async fn logs_in_then_submits_task() {
        let transport = Arc::new(portal());
        let orchestrator = orchestrator(
            &transport,
            &[
                Some("jdoe"),
                Some("hunter2"),
                Some("8/1 Tuesday - 2.5/1h"),
                Some("Acme Insurance"),
                Some("Policy Admin Modernization"),
                Some("Development"),
                Some("billable"),
                Some("2.5"),
                Some("Reviewed claims intake"),
            ],
            RetryPolicy::Flow,
        );

        let outcome = orchestrator.submit(None).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(
            orchestrator.prompt().choices.lock().unwrap()[0],
            vec![
                "7/31 Monday - 0/0h".to_string(),
                "8/1 Tuesday - 2.5/1h".to_string(),
                "8/2 Wednesday - 7.75/0h".to_string(),
                "8/3 Thursday - 0/0h".to_string(),
                "8/4 Friday - 8/0h".to_string(),
            ]
        );
        assert_eq!(
            posted_bodies(&transport),
            vec!["client=101&project=2001&task=31&date=8%2F1%2F2017&activityDescription=Reviewed%20claims%20intake&hrs=2&min=30&billable=true".to_string()]
        );
        assert_eq!(
            orchestrator.prompt().infos(),
            vec!["8/1 task was created with 2:30 billable hours".to_string()]
        );
        assert_eq!(
            orchestrator.status().texts().last().map(String::as_str),
            Some("Task Tracking: jdoe 4.25/0h")
        );
        assert_eq!(orchestrator.prompt().remaining(), 0);
    }

    #[tokio::test]
    async fn given_date_skips_date_picker() {
        let transport = Arc::new(portal());
        let orchestrator = orchestrator(
            &transport,
            &[
                Some("jdoe"),
                Some("hunter2"),
                Some("Acme Insurance"),
                Some("Policy Admin Modernization"),
                Some("Meetings"),
                Some("non-billable"),
                Some("1"),
                Some("Standup"),
            ],
            RetryPolicy::Flow,
        );

        let outcome = orchestrator
            .submit(NaiveDate::from_ymd_opt(2017, 8, 7))
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert!(!orchestrator.prompt().asked().contains(&"Select Date".to_string()));
        let body = &posted_bodies(&transport)[0];
        assert!(body.contains("task=32&date=8%2F7%2F2017"));
        assert!(body.ends_with("hrs=1&min=0&billable=false"));
        assert_eq!(
            orchestrator.prompt().infos(),
            vec!["8/7 task was created with 1:00 non-billable hours".to_string()]
        );
    }

    #[tokio::test]
    async fn bad_hours_restart_flow_keeping_answers() {
        let transport = Arc::new(portal());
        let orchestrator = orchestrator(
            &transport,
            &[
                Some("jdoe"),
                Some("hunter2"),
                Some("8/2 Wednesday - 7.75/0h"),
                Some("Acme Insurance"),
                Some("Policy Admin Modernization"),
                Some("Development"),
                Some("billable"),
                Some("0.8"),
                Some("0.75"),
                Some("Design review"),
            ],
            RetryPolicy::Flow,
        );

        let outcome = orchestrator.submit(None).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(
            orchestrator.prompt().errors(),
            vec!["Can only track tasks with the granularity of 15 minute increments".to_string()]
        );
        assert_eq!(create_form_requests(&transport), 2);
        let body = &posted_bodies(&transport)[0];
        assert!(body.contains("date=8%2F2%2F2017"));
        assert!(body.ends_with("hrs=0&min=45&billable=true"));
    }

    #[tokio::test]
    async fn bad_hours_reask_only_hours_with_step_policy() {
        let transport = Arc::new(portal());
        let orchestrator = orchestrator(
            &transport,
            &[
                Some("jdoe"),
                Some("hunter2"),
                Some("8/2 Wednesday - 7.75/0h"),
                Some("Acme Insurance"),
                Some("Policy Admin Modernization"),
                Some("Development"),
                Some("billable"),
                Some("0.8"),
                Some("abc"),
                Some("1.25"),
                Some("Design review"),
            ],
            RetryPolicy::Step,
        );

        let outcome = orchestrator.submit(None).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(orchestrator.prompt().errors().len(), 2);
        assert_eq!(create_form_requests(&transport), 1);
        assert!(posted_bodies(&transport)[0].ends_with("hrs=1&min=15&billable=true"));
    }

    #[tokio::test]
    async fn cancelling_a_prompt_sends_nothing() {
        let transport = Arc::new(portal());
        let orchestrator = orchestrator(
            &transport,
            &[Some("jdoe"), Some("hunter2"), Some("8/1 Tuesday - 2.5/1h"), None],
            RetryPolicy::Flow,
        );

        let outcome = orchestrator.submit(None).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Cancelled);
        assert!(posted_bodies(&transport).is_empty());
        assert!(orchestrator.prompt().errors().is_empty());
    }

    #[tokio::test]
    async fn cancelling_any_later_prompt_sends_nothing() {
        let answers = [
            "Acme Insurance",
            "Policy Admin Modernization",
            "Development",
            "billable",
            "2.5",
        ];
        let labels = [
            "Select Project",
            "Select Task",
            "Is the task billable?",
            "Select Hours (accepts decimals .25, .5, .75)",
            "What did you do?",
        ];

        for (answered, cancelled_at) in labels.iter().enumerate() {
            let transport = Arc::new(portal());
            let mut script = vec![Some("jdoe"), Some("hunter2")];
            script.extend(answers[..=answered].iter().map(|a| Some(*a)));
            script.push(None);
            let orchestrator = orchestrator(&transport, &script, RetryPolicy::Flow);

            let outcome = orchestrator
                .submit(NaiveDate::from_ymd_opt(2017, 8, 1))
                .await
                .unwrap();

            assert_eq!(outcome, FlowOutcome::Cancelled, "cancelled at {}", cancelled_at);
            assert_eq!(
                orchestrator.prompt().asked().last().map(String::as_str),
                Some(*cancelled_at)
            );
            assert!(posted_bodies(&transport).is_empty(), "cancelled at {}", cancelled_at);
            assert!(orchestrator.prompt().errors().is_empty());
        }
    }

    #[tokio::test]
    async fn rejected_credentials_abort_and_invalidate_session() {
        let transport = Arc::new(
            FakeTransport::new()
                .on(Method::Get, "TaskManagement/", 200, "")
                .on(Method::Get, "Activity/Create", 401, ""),
        );
        let orchestrator = orchestrator(
            &transport,
            &[Some("jdoe"), Some("hunter2")],
            RetryPolicy::Flow,
        );

        let result = orchestrator
            .submit(NaiveDate::from_ymd_opt(2017, 8, 1))
            .await;

        assert!(matches!(
            result,
            Err(FlowError::Portal(PortalError::InvalidCredentials))
        ));
        assert_eq!(
            orchestrator.status().texts().last().map(String::as_str),
            Some("Task Tracking: Invalid Login, Click To Try Again")
        );
        assert_eq!(
            orchestrator.status_action().await,
            crate::status::StatusAction::Login
        );
    }

    #[tokio::test]
    async fn empty_project_list_is_reported() {
        let transport = Arc::new(
            portal().on(Method::Get, "GetProjects?clientId=101", 200, "[]"),
        );
        let orchestrator = orchestrator(
            &transport,
            &[Some("jdoe"), Some("hunter2"), Some("Acme Insurance")],
            RetryPolicy::Flow,
        );

        let result = orchestrator
            .submit(NaiveDate::from_ymd_opt(2017, 8, 1))
            .await;

        assert!(matches!(result, Err(FlowError::NothingToChoose("projects"))));
        assert_eq!(
            orchestrator.prompt().errors(),
            vec!["No projects available to choose from".to_string()]
        );
    }

    #[tokio::test]
    async fn refused_submission_is_rejected() {
        let transport = Arc::new(portal().on(Method::Post, "Activity/Create", 500, ""));
        let orchestrator = orchestrator(
            &transport,
            &[
                Some("jdoe"),
                Some("hunter2"),
                Some("Acme Insurance"),
                Some("Policy Admin Modernization"),
                Some("Development"),
                Some("billable"),
                Some("8"),
                Some("Claims work"),
            ],
            RetryPolicy::Flow,
        );

        let outcome = orchestrator
            .submit(NaiveDate::from_ymd_opt(2017, 8, 4))
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Rejected);
        assert_eq!(
            orchestrator.prompt().errors(),
            vec![NOT_CREATED_MESSAGE.to_string()]
        );
    }
}
