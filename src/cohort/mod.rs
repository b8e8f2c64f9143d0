//! Cohort selection: row filters and trajectory grouping.

pub mod filter;
pub mod trajectory;

pub use filter::*;
pub use trajectory::*;
