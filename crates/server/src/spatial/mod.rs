//! Spatial indexing utilities.
//!
//! The play field is a dense grid of cells addressed by `Position`.

mod grid;

pub use grid::{Cell, Grid};
