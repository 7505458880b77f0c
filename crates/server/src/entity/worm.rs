//! Player-controlled worm.

use protocol::{Direction, Position, WormId};
use protocol::packets::WormView;

/// A worm body with its food progress.
///
/// Only the body is modelled here; the owning `World` keeps grid occupancy
/// in sync with every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worm {
    id: WormId,
    /// Head first. Never empty. Adjacent duplicates appear while growing.
    body: Vec<Position>,
    direction: Direction,
    food_consumed: u32,
    food_needed: u32,
}

impl Worm {
    /// Create a worm. `body` must not be empty.
    pub fn new(id: WormId, body: Vec<Position>, direction: Direction, level_multiplier: u32) -> Self {
        assert!(!body.is_empty(), "worm {id} created without segments");
        let food_needed = food_needed_for(body.len(), level_multiplier);
        Self {
            id,
            body,
            direction,
            food_consumed: 0,
            food_needed,
        }
    }

    #[inline]
    pub fn id(&self) -> WormId {
        self.id
    }

    #[inline]
    pub fn body(&self) -> &[Position] {
        &self.body
    }

    #[inline]
    pub fn head(&self) -> Position {
        self.body[0]
    }

    #[inline]
    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    #[inline]
    pub fn food_consumed(&self) -> u32 {
        self.food_consumed
    }

    #[inline]
    pub fn food_needed(&self) -> u32 {
        self.food_needed
    }

    pub fn covers(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Shift every segment one slot toward the tail and put the head on
    /// `new_head`. Returns the cell the old tail occupied.
    pub fn advance(&mut self, new_head: Position) -> Position {
        let old_tail = self.tail();
        self.body.rotate_right(1);
        self.body[0] = new_head;
        old_tail
    }

    /// Append `amount` copies of the tail. Returns the tail position.
    pub fn grow(&mut self, amount: usize, level_multiplier: u32) -> Position {
        let tail = self.tail();
        self.body.extend(std::iter::repeat_n(tail, amount));
        self.reset_food(level_multiplier);
        tail
    }

    /// Drop up to `amount` segments from the tail, always keeping the head.
    /// Returns the removed segments.
    pub fn shrink(&mut self, amount: usize, level_multiplier: u32) -> Vec<Position> {
        let keep = self.body.len().saturating_sub(amount).max(1);
        let removed = self.body.split_off(keep);
        self.reset_food(level_multiplier);
        removed
    }

    /// Count one eaten food item. Grows by one segment when the threshold
    /// is reached and returns the appended position in that case.
    pub fn eat(&mut self, level_multiplier: u32) -> Option<Position> {
        self.food_consumed += 1;
        if self.food_consumed >= self.food_needed {
            Some(self.grow(1, level_multiplier))
        } else {
            None
        }
    }

    fn reset_food(&mut self, level_multiplier: u32) {
        self.food_consumed = 0;
        self.food_needed = food_needed_for(self.body.len(), level_multiplier);
    }

    pub fn view(&self) -> WormView {
        WormView {
            id: self.id,
            positions: self.body.clone(),
        }
    }
}

fn food_needed_for(len: usize, level_multiplier: u32) -> u32 {
    (len.max(1) as u32).saturating_mul(level_multiplier).max(1)
}
