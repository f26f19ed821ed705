//! dvsync CLI - Dataverse schema alignment from the terminal

mod args;
mod commands;
mod config;
mod logging;
mod output;

#[cfg(test)]
mod args_tests;
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod output_tests;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dvsync_core::CancellationToken;

use args::{Args, Command};
use commands::{EXIT_FAILURE, RunStatus};
use config::FileConfig;
use logging::LoggingConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging_config = LoggingConfig {
        log_dir: args.log_dir.clone(),
        verbose: args.verbose,
    };
    let _log_guard = match logging::init(&logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("dvsync: error: failed to initialize logging: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(args).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("dvsync: error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<RunStatus> {
    let (config, config_path) = FileConfig::discover(args.config.as_deref())?;
    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "loaded config file");
    }

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match args.command {
        Command::Analyze(analyze) => commands::analyze::run(analyze, &config, &cancel).await,
        Command::Apply(apply) => commands::apply::run(apply, &config, &cancel).await,
        Command::Snapshot(snapshot) => commands::snapshot::run(snapshot, &config, &cancel).await,
    }
}

/// Ctrl-C stops work before the next entity or plan item
fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current operation");
            cancel.cancel();
        }
    });
}
