use chrono::NaiveDate;
use clap::Parser;
use taskportal::domain::RangeMode;

use crate::{
    cli::{DateArg, FlowCommand, ShellCommand, ShellLine},
    prompt::Prompt,
    status::{StatusAction, StatusDisplay},
    workflow::{FlowError, FlowOutcome, Orchestrator},
};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Runs one flow. Errors have already been shown to the user by the flow.
pub async fn run_flow<P: Prompt, S: StatusDisplay>(
    orchestrator: &Orchestrator<P, S>,
    command: FlowCommand,
) -> Result<FlowOutcome, FlowError> {
    tracing::debug!("Running {:?}", command);
    match command {
        FlowCommand::Login => orchestrator.login().await,
        FlowCommand::Submit(arg) => orchestrator.submit(arg.date).await,
        FlowCommand::Day(arg) => orchestrator.show_day(arg.date.unwrap_or_else(today)).await,
        FlowCommand::Week(arg) => {
            orchestrator
                .show_range(arg.date.unwrap_or_else(today), RangeMode::Week)
                .await
        }
        FlowCommand::Month(arg) => {
            orchestrator
                .show_range(arg.date.unwrap_or_else(today), RangeMode::Month)
                .await
        }
        FlowCommand::Delete(arg) => orchestrator.delete(arg.date.unwrap_or_else(today)).await,
    }
}

/// What the shell does with one line of input.
#[derive(Debug)]
enum ShellInput {
    /// An empty line: whatever the status line offers.
    Activate,
    Command(ShellCommand),
    Invalid(clap::Error),
}

fn parse_shell_line(line: &str) -> ShellInput {
    if line.trim().is_empty() {
        return ShellInput::Activate;
    }
    match ShellLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => ShellInput::Command(parsed.command),
        Err(e) => ShellInput::Invalid(e),
    }
}

/// Reads commands until `quit` or end of input. The session lives as long
/// as the shell and is cleared when it ends.
pub async fn shell<P: Prompt, S: StatusDisplay>(orchestrator: &Orchestrator<P, S>) {
    let _ = orchestrator.show_status().await;

    loop {
        let Some(line) = orchestrator.read_command().await else {
            break;
        };

        let result = match parse_shell_line(&line) {
            ShellInput::Activate => {
                let command = match orchestrator.status_action().await {
                    StatusAction::Login => FlowCommand::Login,
                    StatusAction::Submit => FlowCommand::Submit(DateArg { date: None }),
                };
                run_flow(orchestrator, command).await
            }
            ShellInput::Command(ShellCommand::Flow(command)) => run_flow(orchestrator, command).await,
            ShellInput::Command(ShellCommand::Status) => orchestrator.show_status().await,
            ShellInput::Command(ShellCommand::Logout) => {
                orchestrator.deactivate().await;
                orchestrator.show_status().await
            }
            ShellInput::Command(ShellCommand::Quit) => break,
            ShellInput::Invalid(e) => {
                let _ = e.print();
                continue;
            }
        };

        match result {
            Ok(outcome) => tracing::debug!("Flow ended: {:?}", outcome),
            Err(e) => tracing::debug!("Flow failed: {}", e),
        }
    }

    orchestrator.deactivate().await;
}
