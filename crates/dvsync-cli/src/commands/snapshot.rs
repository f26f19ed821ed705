//! `dvsync snapshot`

use anyhow::{Context, Result, bail};
use dvsync_core::{CancellationToken, MetadataTransport};
use dvsync_dataverse::{DataverseTransport, write_snapshot_file};

use super::{Reference, RunStatus, connection_settings};
use crate::args::SnapshotArgs;
use crate::config::FileConfig;

pub async fn run(args: SnapshotArgs, config: &FileConfig, cancel: &CancellationToken) -> Result<RunStatus> {
    let entities = entity_names(&args, config)?;
    if entities.is_empty() {
        bail!("Nothing to capture: pass --entity or --schema.");
    }

    let transport = DataverseTransport::new(connection_settings(&args.connection, config));
    let retrieval = transport.retrieve_entities(&entities, cancel).await;
    if cancel.is_cancelled() {
        eprintln!("Operation cancelled.");
        return Ok(RunStatus::Cancelled);
    }
    if !retrieval.available {
        bail!(
            "Dataverse metadata could not be retrieved: {}",
            retrieval
                .unavailable_reason
                .as_deref()
                .unwrap_or("unknown reason")
        );
    }
    for error in &retrieval.errors {
        tracing::warn!("{}", error);
    }

    write_snapshot_file(&args.output, &retrieval.entities)
        .with_context(|| format!("Failed to write snapshot file {}", args.output.display()))?;
    println!(
        "Captured {} of {} entities to {}.",
        retrieval.entities.len(),
        entities.len(),
        args.output.display()
    );

    Ok(RunStatus::Success)
}

/// Explicit `--entity` names, followed by the entities mapped from `--schema`
pub(crate) fn entity_names(args: &SnapshotArgs, config: &FileConfig) -> Result<Vec<String>> {
    let mut names = args.entity.clone();
    if let Some(schema) = &args.schema {
        let reference = Reference::load(schema, args.map.as_deref(), config)?;
        for name in reference.entity_names() {
            if !names.iter().any(|existing| existing.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
