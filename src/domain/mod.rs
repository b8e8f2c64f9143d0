//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations and kinetic parameters (`Observation`, `KineticParameters`)
//! - cleaned input rows and dataset summaries (`VlRecord`, `DatasetStats`)
//! - run configuration and saved curve files (`RunConfig`, `CurveFile`)

pub mod types;

pub use types::*;
