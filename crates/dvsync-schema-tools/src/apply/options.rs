//! Execution policy for applying a plan

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that must be set alongside the drop flag
pub const ALLOW_DROP_ENV: &str = "DVSYNC_ALLOW_DROP";

/// Instruction shown whenever destructive items are skipped
pub const DROP_OPT_IN_INSTRUCTION: &str =
    "Re-run with --allow-drop and set DVSYNC_ALLOW_DROP=1 to remove them.";

/// A pre-change backup export request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupExport {
    pub package_name: String,
    pub directory: PathBuf,
}

/// Policy for one apply invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Whether destructive items may run. Defaults to false.
    pub drops_permitted: bool,
    pub backup: Option<BackupExport>,
    /// Stop before any mutation when the backup export fails
    pub abort_on_backup_failure: bool,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drops_permitted(mut self, permitted: bool) -> Self {
        self.drops_permitted = permitted;
        self
    }

    pub fn with_backup(mut self, package_name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.backup = Some(BackupExport {
            package_name: package_name.into(),
            directory: directory.into(),
        });
        self
    }

    pub fn abort_on_backup_failure(mut self) -> Self {
        self.abort_on_backup_failure = true;
        self
    }
}

/// Drops need both the command-line flag and the environment opt-in
pub fn drops_permitted(allow_drop_flag: bool, env_value: Option<&str>) -> bool {
    allow_drop_flag
        && env_value.is_some_and(|value| {
            let value = value.trim();
            value == "1" || value.eq_ignore_ascii_case("true")
        })
}

/// [`drops_permitted`] reading [`ALLOW_DROP_ENV`] from the process environment
pub fn drops_permitted_from_env(allow_drop_flag: bool) -> bool {
    let env_value = std::env::var(ALLOW_DROP_ENV).ok();
    drops_permitted(allow_drop_flag, env_value.as_deref())
}
