use taskportal::domain::{TaskRecord, UserSession, Validity};

const STATUS_TITLE: &str = "Task Tracking";

/// What activating the status line does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Login,
    Submit,
}

impl StatusAction {
    pub fn command(&self) -> &'static str {
        match self {
            StatusAction::Login => "login",
            StatusAction::Submit => "submit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub action: StatusAction,
}

impl StatusLine {
    pub fn compute(session: &UserSession, weekly_tasks: &[TaskRecord]) -> Self {
        let (billable_hours, non_billable_hours) = hour_totals(weekly_tasks);

        let (text, action) = if session.login_is_pending {
            (format!("{}: Logging In...", STATUS_TITLE), StatusAction::Login)
        } else {
            match (session.validity, session.username()) {
                (Validity::Valid, Some(username)) => (
                    format!(
                        "{}: {} {}/{}h",
                        STATUS_TITLE,
                        username,
                        format_hours(billable_hours),
                        format_hours(non_billable_hours)
                    ),
                    StatusAction::Submit,
                ),
                (Validity::Invalid, _) => (
                    format!("{}: Invalid Login, Click To Try Again", STATUS_TITLE),
                    StatusAction::Login,
                ),
                _ => (
                    format!("{}: Click To Log In", STATUS_TITLE),
                    StatusAction::Login,
                ),
            }
        };

        Self { text, action }
    }
}

/// Billable and non-billable hours, in that order.
pub fn hour_totals(tasks: &[TaskRecord]) -> (f64, f64) {
    tasks.iter().fold((0.0, 0.0), |(billable, non_billable), task| {
        if task.is_billable {
            (billable + task.total_hours(), non_billable)
        } else {
            (billable, non_billable + task.total_hours())
        }
    })
}

/// `8`, `2.5`, `7.75`
pub fn format_hours(hours: f64) -> String {
    let formatted = format!("{:.2}", hours);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub trait StatusDisplay: Send + Sync {
    fn render(&self, session: &UserSession, weekly_tasks: &[TaskRecord]);
}

pub struct TerminalStatus;

impl StatusDisplay for TerminalStatus {
    fn render(&self, session: &UserSession, weekly_tasks: &[TaskRecord]) {
        let line = StatusLine::compute(session, weekly_tasks);
        println!("[{}] (press enter to {})", line.text, line.action.command());
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use taskportal::domain::Credentials;

    use super::*;

    fn task(hours: u32, minutes: u32, is_billable: bool) -> TaskRecord {
        let mut task = TaskRecord::draft(NaiveDate::from_ymd_opt(2017, 8, 1).unwrap());
        task.hours = hours;
        task.minutes = minutes;
        task.is_billable = is_billable;
        task
    }

    #[test]
    fn totals_split_by_billability() {
        let tasks = vec![task(2, 30, true), task(1, 15, true), task(0, 45, false)];
        assert_eq!(hour_totals(&tasks), (3.75, 0.75));
        assert_eq!(hour_totals(&[]), (0.0, 0.0));
    }

    #[test]
    fn formats_hours_compactly() {
        assert_eq!(format_hours(8.0), "8");
        assert_eq!(format_hours(2.5), "2.5");
        assert_eq!(format_hours(7.75), "7.75");
        assert_eq!(format_hours(0.0), "0");
    }

    #[test]
    fn logged_out_offers_login() {
        let line = StatusLine::compute(&UserSession::default(), &[]);
        assert_eq!(line.text, "Task Tracking: Click To Log In");
        assert_eq!(line.action, StatusAction::Login);
    }

    #[test]
    fn pending_and_invalid_states() {
        let mut session = UserSession::default();
        session.set_credentials(Credentials::new("jdoe", "hunter2"));
        session.login_is_pending = true;
        assert_eq!(
            StatusLine::compute(&session, &[]).text,
            "Task Tracking: Logging In..."
        );

        session.mark_checked(false);
        let line = StatusLine::compute(&session, &[]);
        assert_eq!(line.text, "Task Tracking: Invalid Login, Click To Try Again");
        assert_eq!(line.action, StatusAction::Login);
    }

    #[test]
    fn valid_session_shows_week_totals() {
        let mut session = UserSession::default();
        session.set_credentials(Credentials::new("jdoe", "hunter2"));
        session.mark_checked(true);

        let line = StatusLine::compute(&session, &[task(8, 0, true), task(1, 30, false)]);
        assert_eq!(line.text, "Task Tracking: jdoe 8/1.5h");
        assert_eq!(line.action, StatusAction::Submit);
    }
}
