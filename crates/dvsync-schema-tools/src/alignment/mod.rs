//! Schema alignment module
//!
//! Matches reference tables against remote entity snapshots and records
//! drift in both directions.

mod analyzer;
mod result;


pub use analyzer::*;
pub use result::*;
