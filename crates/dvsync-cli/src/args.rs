//! CLI argument parsing using clap.

use clap::{Parser, Subcommand};
use dvsync_dataverse::ConnectionSettings;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA_PATH: &str = "artifacts/mysql/rebuild_schema.sql";
pub const DEFAULT_REPORT_PATH: &str = "docs/dv_alignment_report.md";
pub const DEFAULT_DELETE_CANDIDATES_PATH: &str = "docs/dv_delete_candidates.json";

/// dvsync - keep Dataverse tables aligned with a SQL reference schema
#[derive(Parser, Debug)]
#[command(name = "dvsync")]
#[command(about = "Align Dataverse table metadata with a SQL reference schema", long_about = None)]
#[command(version)]
pub struct Args {
    /// Configuration file (defaults to ./dvsync.toml, then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare the reference schema with the target and write the alignment report
    Analyze(AnalyzeArgs),

    /// Analyze, plan and apply schema changes to the live organization
    Apply(ApplyArgs),

    /// Save live entity metadata to a snapshot file for offline analysis
    Snapshot(SnapshotArgs),
}

/// Dataverse connection, each value falling back to its `DV_*` variable
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Organization URL (e.g., https://contoso.crm.dynamics.com)
    #[arg(long, env = "DV_ORG_URL", value_name = "URL")]
    pub org_url: Option<String>,

    /// App registration client id
    #[arg(long, env = "DV_CLIENT_ID", value_name = "ID")]
    pub client_id: Option<String>,

    /// App registration client secret
    #[arg(long, env = "DV_CLIENT_SECRET", value_name = "SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Azure AD tenant id
    #[arg(long, env = "DV_TENANT_ID", value_name = "ID")]
    pub tenant_id: Option<String>,
}

impl ConnectionArgs {
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            org_url: self.org_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

/// Inputs and outputs shared by `analyze` and `apply`
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// SQL DDL script describing the reference schema
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_SCHEMA_PATH)]
    pub schema: PathBuf,

    /// JSON object mapping reference table names to entity logical names
    #[arg(short, long, value_name = "FILE")]
    pub map: Option<PathBuf>,

    /// Markdown alignment report destination
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Read entity metadata from a snapshot file instead of the live organization
    #[arg(long, value_name = "FILE")]
    pub snapshot_file: Option<PathBuf>,

    /// Write the destructive items of the plan to the delete-candidates file
    #[arg(long)]
    pub dry_run: bool,

    /// Delete-candidates destination used by --dry-run
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DELETE_CANDIDATES_PATH)]
    pub delete_candidates: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Permit removals (also requires DVSYNC_ALLOW_DROP=1)
    #[arg(long)]
    pub allow_drop: bool,

    /// Export this solution as a backup before changing anything
    #[arg(long, value_name = "NAME")]
    pub backup_solution: Option<String>,

    /// Directory receiving the backup export (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Stop before any change when the backup export fails
    #[arg(long)]
    pub abort_on_backup_failure: bool,
}

#[derive(clap::Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Capture the entities mapped from this SQL DDL script
    #[arg(short, long, value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// JSON object mapping reference table names to entity logical names
    #[arg(short, long, value_name = "FILE", requires = "schema")]
    pub map: Option<PathBuf>,

    /// Entity logical names to capture (comma-separated or repeated)
    #[arg(short, long, value_name = "NAME", value_delimiter = ',')]
    pub entity: Vec<String>,

    /// Snapshot file destination
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}
