//! `dvsync analyze`

use anyhow::{Context, Result};
use chrono::Utc;
use dvsync_core::{CancellationToken, MetadataTransport};
use dvsync_dataverse::{DataverseTransport, SnapshotFileTransport};
use dvsync_schema_tools::{AlignmentReport, DeleteCandidates};

use super::{Reference, RunStatus, align, connection_settings};
use crate::args::AnalyzeArgs;
use crate::config::FileConfig;
use crate::output::format_plan_summary;

pub async fn run(args: AnalyzeArgs, config: &FileConfig, cancel: &CancellationToken) -> Result<RunStatus> {
    let reference = Reference::load(&args.source.schema, args.source.map.as_deref(), config)?;

    let transport: Box<dyn MetadataTransport> = match &args.snapshot_file {
        Some(path) => Box::new(SnapshotFileTransport::open(path).with_context(|| {
            format!("Failed to open snapshot file {}", path.display())
        })?),
        None => Box::new(DataverseTransport::new(connection_settings(
            &args.connection,
            config,
        ))),
    };

    let alignment = align(&reference, transport.as_ref(), cancel).await;
    if cancel.is_cancelled() {
        eprintln!("Operation cancelled.");
        return Ok(RunStatus::Cancelled);
    }

    AlignmentReport::new(
        &alignment.analysis,
        &alignment.retrieval,
        &reference.native_fields,
    )
    .with_source(args.source.schema.display().to_string())
    .with_plan(&alignment.plan)
    .write_to(&args.source.report)
    .with_context(|| format!("Failed to write report {}", args.source.report.display()))?;

    println!("Alignment report written to {}.", args.source.report.display());
    if !alignment.retrieval.available {
        println!("Dataverse metadata could not be retrieved; report contains SQL-only details.");
    }
    println!("{}", format_plan_summary(&alignment.plan));

    if args.dry_run {
        DeleteCandidates::from_plan(&alignment.plan, Utc::now())
            .write_to(&args.delete_candidates)
            .with_context(|| {
                format!(
                    "Failed to write delete candidates {}",
                    args.delete_candidates.display()
                )
            })?;
        println!(
            "Dry-run complete. Deletion candidates written to {}.",
            args.delete_candidates.display()
        );
    }

    Ok(RunStatus::Success)
}
