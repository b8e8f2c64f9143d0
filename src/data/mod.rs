//! Data sources other than user CSV files.

pub mod synth;

pub use synth::*;
