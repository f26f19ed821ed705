//! Configuration file support
//!
//! `dvsync.toml` carries the settings that rarely change between runs:
//!
//! ```toml
//! [connection]
//! org_url = "https://contoso.crm.dynamics.com"
//! client_id = "..."
//! tenant_id = "..."
//!
//! [tables]
//! Customer = "account"
//!
//! [native_fields]
//! replace_defaults = false
//! LastLoginAt = "cr123_lastlogin"
//!
//! [apply]
//! backup_solution = "CoreSolution"
//! backup_dir = "backups"
//! abort_on_backup_failure = true
//! ```
//!
//! The client secret is only read from the command line or `DV_CLIENT_SECRET`.

use anyhow::{Context, Result};
use dvsync_core::{NameMap, NativeFieldMap};
use dvsync_dataverse::ConnectionSettings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "dvsync.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub connection: ConnectionSection,
    pub tables: NameMap,
    pub native_fields: NativeFieldsSection,
    pub apply: ApplySection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionSection {
    pub org_url: Option<String>,
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NativeFieldsSection {
    /// Start from an empty map instead of the Dataverse defaults
    pub replace_defaults: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplySection {
    pub backup_solution: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub abort_on_backup_failure: bool,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load the explicit config file, else the first candidate that exists
    ///
    /// Returns the default configuration when no file is found.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Self::discover_in(explicit, &candidate_paths())
    }

    pub(crate) fn discover_in(
        explicit: Option<&Path>,
        candidates: &[PathBuf],
    ) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using config file");
                Ok((Self::load(path)?, Some(path.clone())))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Native-field substitutions: defaults unless replaced, plus configured pairs
    pub fn native_fields(&self) -> NativeFieldMap {
        let mut map = if self.native_fields.replace_defaults {
            NativeFieldMap::empty()
        } else {
            NativeFieldMap::dataverse_defaults()
        };
        for (column, attribute) in &self.native_fields.fields {
            map.insert(column, attribute);
        }
        map
    }

    /// Connection values from the file, used where the command line and
    /// environment leave gaps
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            org_url: self.connection.org_url.clone(),
            client_id: self.connection.client_id.clone(),
            client_secret: None,
            tenant_id: self.connection.tenant_id.clone(),
        }
    }

    /// Table overrides from `[tables]` with the `--map` file merged over them
    pub fn table_overrides(&self, map_file: Option<&Path>) -> Result<NameMap> {
        let mut overrides = self.tables.clone();
        if let Some(path) = map_file {
            overrides.extend_from(&load_map_file(path)?);
        }
        Ok(overrides)
    }
}

/// Read a JSON object of table name to entity logical name pairs
pub fn load_map_file(path: &Path) -> Result<NameMap> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table map {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Table map {} must be a JSON object of strings", path.display()))
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("dvsync").join("config.toml"));
    }
    paths
}
