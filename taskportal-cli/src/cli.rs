use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "taskportal")]
#[command(about = "Book hours on the task tracking portal from the terminal")]
pub struct Cli {
    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Username offered at the login prompt
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Portal base URL, e.g. https://example.com/TaskManagement/
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct DateArg {
    /// Day to work on, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// The commands that run one flow against the portal.
#[derive(Debug, Subcommand)]
pub enum FlowCommand {
    /// Log in and show this week's hours
    Login,
    /// Book a task, picking a day from last week unless --date is given
    Submit(DateArg),
    /// List the activities booked on a day (default today)
    Day(DateArg),
    /// List the calendar entries of a week with totals
    Week(DateArg),
    /// List the calendar entries of a month with totals
    Month(DateArg),
    /// Delete one of a day's activities
    Delete(DateArg),
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Flow(FlowCommand),
    /// Keep a session open and run several commands
    Shell,
    /// Print config path and create default file if missing
    ConfigPath,
}

/// One line typed into the shell.
#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    Flow(FlowCommand),
    /// Redraw the status line
    Status,
    /// Forget the credentials
    Logout,
    #[command(alias = "exit")]
    Quit,
}
