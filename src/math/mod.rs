//! Mathematical utilities: percentiles and residual summaries.

pub mod stats;

pub use stats::*;
