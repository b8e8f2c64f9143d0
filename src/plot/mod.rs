//! Plot rendering: terminal ASCII grids and SVG figures.

pub mod ascii;
pub mod figure;

pub use ascii::*;
pub use figure::*;
