//! Schema change planning module
//!
//! Turns an alignment analysis into a serializable change plan.

mod plan;
mod planner;


pub use plan::*;
pub use planner::*;
