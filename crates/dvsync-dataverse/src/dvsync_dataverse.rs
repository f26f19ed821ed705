//! Dataverse metadata transports for dvsync
//!
//! `DataverseTransport` talks to a live organization through the Web API
//! using client-credentials authentication. `SnapshotFileTransport` serves
//! retrieval from a JSON snapshot so analyses can run offline.

mod client;
mod offline;
mod settings;
mod transport;
pub mod wire;

#[cfg(test)]
mod offline_tests;
#[cfg(test)]
mod settings_tests;
#[cfg(test)]
mod wire_tests;

pub use client::{API_VERSION, DataverseClient, DataverseError, DataverseResult};
pub use offline::{SnapshotFileTransport, write_snapshot_file};
pub use settings::{
    CLIENT_ID_ENV, CLIENT_SECRET_ENV, ConnectionSettings, ORG_URL_ENV, TENANT_ID_ENV,
};
pub use transport::{DataverseTransport, backup_file_name};
