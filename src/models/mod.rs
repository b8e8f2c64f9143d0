//! Kinetic model implementations.
//!
//! Models are small, pure functions so that fitting and plotting code can share
//! them without carrying state around.

pub mod model;

pub use model::*;
