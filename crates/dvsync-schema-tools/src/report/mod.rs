//! Human and review-oriented renderings of analyses, plans and apply runs

mod delete_candidates;
mod markdown;

#[cfg(test)]
mod tests;

pub use delete_candidates::*;
pub use markdown::*;
