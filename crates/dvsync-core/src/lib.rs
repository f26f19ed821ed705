//! dvsync Core - shared model and contracts for schema alignment
//!
//! This crate provides the types that every other dvsync crate depends on:
//!
//! - `SqlSchema` and friends - the relational reference schema model
//! - `EntityMetadata` - a read-only snapshot of a remote entity's structure
//! - `AttributeDefinition` - the attribute shape sent to the remote platform
//! - `MetadataTransport` - the boundary trait every remote binding implements
//! - `NameMap` / `NativeFieldMap` - case-insensitive name lookup tables
//! - `ddl` - a loader that turns `CREATE TABLE` scripts into a `SqlSchema`

mod attribute;
pub mod ddl;
mod error;
mod metadata;
mod names;
pub mod naming;
mod reference;
mod transport;

pub use attribute::*;
pub use error::*;
pub use metadata::*;
pub use names::*;
pub use reference::*;
pub use transport::*;

pub use tokio_util::sync::CancellationToken;
