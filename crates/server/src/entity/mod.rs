//! Game entities.
//!
//! Worms and bombs. Food has no entity of its own; it is a flag on a grid cell.

mod bomb;
mod worm;

pub use bomb::Bomb;
pub use worm::Worm;
