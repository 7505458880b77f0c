//! Timed area bomb.

use protocol::packets::BombView;
use protocol::{BombId, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bomb {
    id: BombId,
    center: Position,
    blast_cells: Vec<Position>,
    seconds_remaining: u32,
}

impl Bomb {
    /// Build a bomb whose blast covers the square of `radius` around
    /// `center`, clipped to a `width x height` grid.
    pub fn new(id: BombId, center: Position, radius: u32, width: u32, height: u32, seconds: u32) -> Self {
        let low_x = center.x.saturating_sub(radius);
        let high_x = center.x.saturating_add(radius).min(width - 1);
        let low_y = center.y.saturating_sub(radius);
        let high_y = center.y.saturating_add(radius).min(height - 1);

        let blast_cells = (low_x..=high_x)
            .flat_map(|x| (low_y..=high_y).map(move |y| Position::new(x, y)))
            .collect();

        Self {
            id,
            center,
            blast_cells,
            seconds_remaining: seconds,
        }
    }

    #[inline]
    pub fn id(&self) -> BombId {
        self.id
    }

    #[inline]
    pub fn center(&self) -> Position {
        self.center
    }

    #[inline]
    pub fn blast_cells(&self) -> &[Position] {
        &self.blast_cells
    }

    #[inline]
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Count down one second. Returns true once the timer hits zero.
    pub fn tick(&mut self) -> bool {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        self.seconds_remaining == 0
    }

    pub fn view(&self) -> BombView {
        BombView {
            id: self.id,
            seconds_left: self.seconds_remaining,
            center: self.center,
            blast_cells: self.blast_cells.clone(),
        }
    }
}
