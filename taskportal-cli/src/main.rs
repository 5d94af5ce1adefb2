mod cli;
mod commands;
mod config;
mod prompt;
mod status;
mod workflow;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use taskportal::PortalClient;

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    prompt::TerminalPrompt,
    status::TerminalStatus,
    workflow::{Orchestrator, WorkflowSettings},
};

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into()),
        1 => "info".into(),
        _ => "debug".into(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = match cli.command {
        Commands::ConfigPath => {
            let path = AppConfig::config_path()?;
            if AppConfig::write_default_if_missing(&path)? {
                eprintln!("Created default config");
            }
            println!("{}", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        command => command,
    };

    let mut config = AppConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if cli.username.is_some() {
        config.username = cli.username;
    }
    tracing::debug!("Using portal at {}", config.base_url);

    let client = PortalClient::with_reqwest(
        config.base_url.clone(),
        config.workstation(),
        config.timeout(),
    )
    .context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(
        client,
        TerminalPrompt,
        TerminalStatus,
        WorkflowSettings {
            retry_policy: config.retry_policy,
            default_username: config.username,
        },
    );

    let exit_code = match command {
        Commands::Flow(flow) => {
            let result = commands::run_flow(&orchestrator, flow).await;
            match result {
                Ok(outcome) => {
                    tracing::debug!("Flow ended: {:?}", outcome);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::debug!("Flow failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Shell => {
            commands::shell(&orchestrator).await;
            ExitCode::SUCCESS
        }
        Commands::ConfigPath => ExitCode::SUCCESS,
    };

    orchestrator.deactivate().await;
    Ok(exit_code)
}
