//! `dvsync apply`

use anyhow::{Context, Result, bail};
use dvsync_core::CancellationToken;
use dvsync_dataverse::DataverseTransport;
use dvsync_schema_tools::{
    AlignmentReport, ExecutionLog, ExecutionOptions, SchemaApplier, drops_permitted_from_env,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::{Reference, RunStatus, align, connection_settings};
use crate::args::ApplyArgs;
use crate::config::{ApplySection, FileConfig};
use crate::output::{format_execution_log, format_plan_summary};

pub async fn run(args: ApplyArgs, config: &FileConfig, cancel: &CancellationToken) -> Result<RunStatus> {
    let reference = Reference::load(&args.source.schema, args.source.map.as_deref(), config)?;
    let transport = Arc::new(DataverseTransport::new(connection_settings(
        &args.connection,
        config,
    )));

    let alignment = align(&reference, transport.as_ref(), cancel).await;
    if cancel.is_cancelled() {
        eprintln!("Operation cancelled.");
        return Ok(RunStatus::Cancelled);
    }

    let report = AlignmentReport::new(
        &alignment.analysis,
        &alignment.retrieval,
        &reference.native_fields,
    )
    .with_source(args.source.schema.display().to_string())
    .with_plan(&alignment.plan);

    if !alignment.retrieval.available {
        report
            .write_to(&args.source.report)
            .with_context(|| format!("Failed to write report {}", args.source.report.display()))?;
        let reason = alignment
            .retrieval
            .unavailable_reason
            .as_deref()
            .unwrap_or("metadata retrieval failed");
        bail!("Cannot apply schema changes without a Dataverse connection ({reason}).");
    }

    println!("{}", format_plan_summary(&alignment.plan));

    let options = execution_options(&args, &config.apply, drops_permitted_from_env(args.allow_drop));
    let applier = SchemaApplier::new(transport, reference.native_fields.clone());
    let log = applier
        .apply(&alignment.plan, &options, &alignment.retrieval.entities, cancel)
        .await;

    report
        .with_execution_log(&log)
        .write_to(&args.source.report)
        .with_context(|| format!("Failed to write report {}", args.source.report.display()))?;

    println!("{}", format_execution_log(&log));
    println!("Alignment report written to {}.", args.source.report.display());

    Ok(status(&log))
}

/// Command-line values win over the `[apply]` section
pub(crate) fn execution_options(
    args: &ApplyArgs,
    config: &ApplySection,
    drops_permitted: bool,
) -> ExecutionOptions {
    let mut options = ExecutionOptions::new().with_drops_permitted(drops_permitted);

    if let Some(package) = args
        .backup_solution
        .clone()
        .or_else(|| config.backup_solution.clone())
    {
        let directory = args
            .backup_dir
            .clone()
            .or_else(|| config.backup_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        options = options.with_backup(package, directory);
    }

    if args.abort_on_backup_failure || config.abort_on_backup_failure {
        options = options.abort_on_backup_failure();
    }

    options
}

pub(crate) fn status(log: &ExecutionLog) -> RunStatus {
    if log.cancelled {
        RunStatus::Cancelled
    } else if log.has_failures() || log.aborted {
        RunStatus::Failed
    } else {
        RunStatus::Success
    }
}
