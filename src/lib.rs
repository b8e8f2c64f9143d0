//! `viral-kinetics` library crate.
//!
//! The binary (`vkx`) is a thin wrapper around this library so that:
//!
//! - filtering and fitting are testable without spawning processes
//! - the fitter can be reused without the CLI/TUI layers

pub mod app;
pub mod cli;
pub mod cohort;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
