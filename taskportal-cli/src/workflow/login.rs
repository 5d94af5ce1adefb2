use taskportal::domain::{Credentials, UserSession};

use super::{FlowError, FlowOutcome, Orchestrator};
use crate::{prompt::Prompt, status::StatusDisplay};

pub const INVALID_LOGIN_MESSAGE: &str = "Invalid username and password combination.";
const PASSWORD_LABEL: &str = "Password (only kept in memory, never written to disk)";
const RETRY_LOGIN: &str = "Retry login";
const CANCEL: &str = "Cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    AwaitingUsername,
    AwaitingPassword,
    Validating,
    Valid,
    Invalid,
}

impl<P: Prompt, S: StatusDisplay> Orchestrator<P, S> {
    pub(super) async fn run_login(
        &self,
        session: &mut UserSession,
    ) -> Result<FlowOutcome, FlowError> {
        let mut state = LoginState::AwaitingUsername;
        let mut username = String::new();
        let mut password = String::new();

        loop {
            tracing::debug!("Login state {:?}", state);
            state = match state {
                LoginState::AwaitingUsername => {
                    let label = match &self.settings.default_username {
                        Some(default) => format!("Username [{}]", default),
                        None => "Username".to_string(),
                    };
                    let Some(answer) = self.prompt.request_text(&label, false).await else {
                        return Ok(FlowOutcome::Cancelled);
                    };

                    username = match (answer.trim(), &self.settings.default_username) {
                        ("", Some(default)) => default.clone(),
                        ("", None) => return Ok(FlowOutcome::Cancelled),
                        (typed, _) => typed.to_string(),
                    };
                    LoginState::AwaitingPassword
                }
                LoginState::AwaitingPassword => {
                    let Some(answer) = self.prompt.request_text(PASSWORD_LABEL, true).await else {
                        return Ok(FlowOutcome::Cancelled);
                    };
                    password = answer;
                    LoginState::Validating
                }
                LoginState::Validating => {
                    session.set_credentials(Credentials::new(
                        std::mem::take(&mut username),
                        std::mem::take(&mut password),
                    ));
                    session.login_is_pending = true;
                    self.status.render(session, &[]);

                    let Some(credentials) = session.credentials() else {
                        return Ok(FlowOutcome::Cancelled);
                    };
                    match self.client.check_login(credentials).await {
                        Ok(true) => {
                            session.mark_checked(true);
                            LoginState::Valid
                        }
                        Ok(false) => {
                            session.mark_checked(false);
                            LoginState::Invalid
                        }
                        Err(e) => {
                            session.login_is_pending = false;
                            self.status.render(session, &[]);
                            let error = FlowError::Transport(e);
                            self.prompt.show_error(&error.to_string()).await;
                            return Err(error);
                        }
                    }
                }
                LoginState::Valid => {
                    tracing::info!("Logged in as {}", session.username().unwrap_or_default());
                    self.refresh_status(session).await;
                    return Ok(FlowOutcome::Completed);
                }
                LoginState::Invalid => {
                    self.status.render(session, &[]);
                    self.prompt.show_error(INVALID_LOGIN_MESSAGE).await;

                    let options = [RETRY_LOGIN.to_string(), CANCEL.to_string()];
                    match self
                        .prompt
                        .request_choice("Try logging in again?", &options)
                        .await
                        .as_deref()
                    {
                        Some(RETRY_LOGIN) => LoginState::AwaitingUsername,
                        _ => return Ok(FlowOutcome::Rejected),
                    }
                }
            };
        }
    }
}
