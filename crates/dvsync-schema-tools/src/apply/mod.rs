//! Plan application module
//!
//! Executes a change plan through a `MetadataTransport`, one item at a time,
//! with destructive items gated behind an explicit opt-in.

mod applier;
mod log;
mod options;
mod type_mapper;


pub use applier::*;
pub use log::*;
pub use options::*;
pub use type_mapper::*;
