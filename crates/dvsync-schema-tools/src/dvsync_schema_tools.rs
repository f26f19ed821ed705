//! dvsync Schema Tools - alignment, planning and apply
//!
//! This crate provides functionality for:
//! - Aligning a relational reference schema with remote entity metadata
//! - Planning the additive and destructive changes that close the drift
//! - Applying a plan through a `MetadataTransport`, with drop gating
//! - Rendering analyses, plans and execution logs for humans

pub mod alignment;
pub mod apply;
pub mod planning;
pub mod report;

pub use alignment::*;
pub use apply::*;
pub use planning::*;
pub use report::*;
