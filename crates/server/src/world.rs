//! World state management.
//!
//! Owns the grid, every worm and every bomb, and keeps grid occupancy in
//! step with worm bodies. Each public method is one complete transition.

use crate::collision::{self, Outcome};
use crate::config::BombConfig;
use crate::entity::{Bomb, Worm};
use crate::spatial::Grid;
use protocol::packets::{BombView, WormView};
use protocol::{BombId, Direction, Position, WormId};
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// Length of a freshly spawned worm.
pub const SPAWN_LENGTH: u32 = 3;
/// Minimum distance between a spawned head and any wall.
pub const SPAWN_MARGIN: u32 = 5;
const SPAWN_PROBES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("Unknown worm {0}")]
    UnknownWorm(WormId),

    #[error("No free cells left to spawn a worm")]
    NoSpawnRoom,
}

/// A food item eaten during a movement tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meal {
    pub worm: WormId,
    pub position: Position,
    pub consumed: u32,
    pub needed: u32,
}

/// Everything a movement tick changed besides the bodies themselves.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Worms whose food progress was reset by a wall or worm collision.
    pub collided: Vec<WormId>,
    pub meals: Vec<Meal>,
    /// Worms that grew, with the appended tail position.
    pub extensions: Vec<(WormId, Position)>,
}

/// Result of a bomb blowing up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detonation {
    pub bomb: BombId,
    /// Worms that lost segments, by id.
    pub damaged: Vec<WormId>,
}

/// State of a bomb after one countdown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BombTick {
    Counting(u32),
    Detonated(Detonation),
    /// No bomb with that id.
    Gone,
}

/// The game world: grid plus worm and bomb registries.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    level_multiplier: u32,
    worms: BTreeMap<WormId, Worm>,
    bombs: BTreeMap<BombId, Bomb>,
    next_worm_id: u64,
    next_bomb_id: u64,
}

impl World {
    pub fn new(width: u32, height: u32, level_multiplier: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
            level_multiplier,
            worms: BTreeMap::new(),
            bombs: BTreeMap::new(),
            next_worm_id: 1,
            next_bomb_id: 1,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn worm(&self, id: WormId) -> Option<&Worm> {
        self.worms.get(&id)
    }

    pub fn worms(&self) -> impl Iterator<Item = &Worm> + '_ {
        self.worms.values()
    }

    pub fn bomb(&self, id: BombId) -> Option<&Bomb> {
        self.bombs.get(&id)
    }

    pub fn bombs(&self) -> impl Iterator<Item = &Bomb> + '_ {
        self.bombs.values()
    }

    // ---- worms ----

    /// Spawn a length-3 worm heading right on unoccupied cells.
    pub fn spawn_worm<R: Rng>(&mut self, rng: &mut R) -> Result<WormId, WorldError> {
        let x_range = SPAWN_MARGIN..self.grid.width().saturating_sub(SPAWN_MARGIN).max(SPAWN_MARGIN + 1);
        let y_range = SPAWN_MARGIN..self.grid.height().saturating_sub(SPAWN_MARGIN).max(SPAWN_MARGIN + 1);

        let mut head = None;
        for _ in 0..SPAWN_PROBES {
            let candidate = Position::new(
                rng.random_range(x_range.clone()),
                rng.random_range(y_range.clone()),
            );
            if self.spawn_fits(candidate) {
                head = Some(candidate);
                break;
            }
        }

        // Crowded grid: fall back to a full scan before giving up.
        let head = match head {
            Some(head) => head,
            None => x_range
                .flat_map(|x| y_range.clone().map(move |y| Position::new(x, y)))
                .find(|&p| self.spawn_fits(p))
                .ok_or(WorldError::NoSpawnRoom)?,
        };

        let body = (0..SPAWN_LENGTH)
            .map(|i| Position::new(head.x - i, head.y))
            .collect();
        Ok(self.insert_worm(body, Direction::Right))
    }

    fn spawn_fits(&self, head: Position) -> bool {
        (0..SPAWN_LENGTH).all(|i| {
            head.x >= i && {
                let pos = Position::new(head.x - i, head.y);
                self.grid.contains(pos) && self.grid.cell(pos).occupant.is_none()
            }
        })
    }

    /// Place a worm with an explicit body. Cells must be unoccupied by other worms.
    pub fn insert_worm(&mut self, body: Vec<Position>, direction: Direction) -> WormId {
        let id = WormId(self.next_worm_id);
        self.next_worm_id += 1;

        for &pos in &body {
            debug_assert!(
                self.grid.cell(pos).occupant.is_none_or(|o| o == id),
                "spawning worm {id} over another worm at {pos}"
            );
            self.grid.set_occupant(pos, Some(id));
        }
        self.worms
            .insert(id, Worm::new(id, body, direction, self.level_multiplier));
        id
    }

    /// Delete a worm and clear every cell it occupied.
    pub fn remove_worm(&mut self, id: WormId) -> Result<Worm, WorldError> {
        let worm = self.worms.remove(&id).ok_or(WorldError::UnknownWorm(id))?;
        for &pos in worm.body() {
            if self.grid.cell(pos).occupant == Some(id) {
                self.grid.set_occupant(pos, None);
            }
        }
        Ok(worm)
    }

    pub fn set_direction(&mut self, id: WormId, direction: Direction) -> Result<(), WorldError> {
        let worm = self.worms.get_mut(&id).ok_or(WorldError::UnknownWorm(id))?;
        worm.set_direction(direction);
        Ok(())
    }

    /// Append `amount` copies of the tail. Returns the tail position.
    pub fn extend_worm(&mut self, id: WormId, amount: usize) -> Result<Position, WorldError> {
        let worm = self.worms.get_mut(&id).ok_or(WorldError::UnknownWorm(id))?;
        // Duplicated tail cells are already occupied by this worm.
        Ok(worm.grow(amount, self.level_multiplier))
    }

    /// Cut up to `amount` segments off the tail, keeping at least the head.
    pub fn reduce_worm(&mut self, id: WormId, amount: usize) -> Result<(), WorldError> {
        let worm = self.worms.get_mut(&id).ok_or(WorldError::UnknownWorm(id))?;
        let removed = worm.shrink(amount, self.level_multiplier);
        for pos in removed {
            if !worm.covers(pos) && self.grid.cell(pos).occupant == Some(id) {
                self.grid.set_occupant(pos, None);
            }
        }
        Ok(())
    }

    /// Eat the food at `pos` (the worm's head).
    pub fn consume_food(&mut self, id: WormId, pos: Position) -> Result<(Meal, Option<Position>), WorldError> {
        let worm = self.worms.get_mut(&id).ok_or(WorldError::UnknownWorm(id))?;
        self.grid.set_food(pos, false);
        let grown = worm.eat(self.level_multiplier);
        let meal = Meal {
            worm: id,
            position: pos,
            consumed: worm.food_consumed(),
            needed: worm.food_needed(),
        };
        Ok((meal, grown))
    }

    fn advance_worm(&mut self, id: WormId, target: Position) -> Result<(), WorldError> {
        let worm = self.worms.get_mut(&id).ok_or(WorldError::UnknownWorm(id))?;
        let old_tail = worm.advance(target);
        self.grid.set_occupant(target, Some(id));
        if !worm.covers(old_tail) {
            self.grid.set_occupant(old_tail, None);
        }
        Ok(())
    }

    /// Run one movement tick for every worm.
    pub fn step(&mut self) -> Result<TickReport, WorldError> {
        let plan = collision::plan_tick(&self.grid, self.worms.values());
        let mut report = TickReport::default();

        for (id, outcome) in plan.outcomes {
            match outcome {
                Outcome::Advance(target) => {
                    self.advance_worm(id, target)?;
                    if self.grid.cell(target).food {
                        let (meal, grown) = self.consume_food(id, target)?;
                        report.meals.push(meal);
                        if let Some(tail) = grown {
                            report.extensions.push((id, tail));
                        }
                    }
                }
                Outcome::Wall { loss } | Outcome::Hit { loss, .. } => {
                    let before = self.progress(id)?;
                    self.reduce_worm(id, loss)?;
                    if self.progress(id)? != before {
                        report.collided.push(id);
                    }
                }
                Outcome::Tie | Outcome::Blocked => {}
            }
        }

        for (victim, amount) in plan.gains {
            if amount > 0 {
                let tail = self.extend_worm(victim, amount)?;
                report.extensions.push((victim, tail));
            }
        }

        debug_assert!(self.is_consistent(), "grid occupancy diverged after a tick");
        Ok(report)
    }

    fn progress(&self, id: WormId) -> Result<(u32, u32), WorldError> {
        let worm = self.worms.get(&id).ok_or(WorldError::UnknownWorm(id))?;
        Ok((worm.food_consumed(), worm.food_needed()))
    }

    // ---- food ----

    /// Try to place `count` food items with up to `probes` random cells each.
    /// Returns the cells that received food; may be fewer than `count`.
    pub fn spawn_food<R: Rng>(&mut self, rng: &mut R, count: u32, probes: u32) -> Vec<Position> {
        let mut placed = Vec::with_capacity(count as usize);
        for _ in 0..count {
            for _ in 0..probes {
                let pos = Position::new(
                    rng.random_range(0..self.grid.width()),
                    rng.random_range(0..self.grid.height()),
                );
                if self.place_food(pos) {
                    placed.push(pos);
                    break;
                }
            }
        }
        placed
    }

    /// Put food on `pos` if it holds neither food nor a worm.
    pub fn place_food(&mut self, pos: Position) -> bool {
        if !self.grid.is_free(pos) {
            return false;
        }
        self.grid.set_food(pos, true);
        true
    }

    // ---- bombs ----

    /// Place a bomb at a random center with a random radius and fuse.
    pub fn spawn_bomb<R: Rng>(&mut self, rng: &mut R, config: &BombConfig) -> &Bomb {
        let center = Position::new(
            rng.random_range(0..self.grid.width()),
            rng.random_range(0..self.grid.height()),
        );
        let radius = rng.random_range(config.min_radius..=config.max_radius);
        let seconds = rng.random_range(config.min_detonation_secs..=config.max_detonation_secs);
        self.insert_bomb(center, radius, seconds)
    }

    /// Place a bomb with explicit parameters.
    pub fn insert_bomb(&mut self, center: Position, radius: u32, seconds: u32) -> &Bomb {
        let id = BombId(self.next_bomb_id);
        self.next_bomb_id += 1;
        let bomb = Bomb::new(id, center, radius, self.grid.width(), self.grid.height(), seconds);
        self.bombs.entry(id).or_insert(bomb)
    }

    /// Advance a bomb's countdown by one second, detonating it at zero.
    pub fn tick_bomb(&mut self, id: BombId) -> BombTick {
        let Some(bomb) = self.bombs.get_mut(&id) else {
            return BombTick::Gone;
        };
        if !bomb.tick() {
            return BombTick::Counting(bomb.seconds_remaining());
        }
        match self.detonate(id) {
            Some(detonation) => BombTick::Detonated(detonation),
            None => BombTick::Gone,
        }
    }

    /// Remove a bomb and apply one segment of damage per occupied blast cell.
    pub fn detonate(&mut self, id: BombId) -> Option<Detonation> {
        let bomb = self.bombs.remove(&id)?;

        let mut damage: BTreeMap<WormId, usize> = BTreeMap::new();
        for &pos in bomb.blast_cells() {
            if let Some(worm) = self.grid.cell(pos).occupant {
                *damage.entry(worm).or_insert(0) += 1;
            }
        }

        let mut damaged = Vec::with_capacity(damage.len());
        for (worm, units) in damage {
            let reduced = self.reduce_worm(worm, units);
            debug_assert!(reduced.is_ok(), "bomb {id} hit a cell owned by missing worm {worm}");
            match reduced {
                Ok(()) => damaged.push(worm),
                Err(e) => error!("Bomb {} hit a cell owned by a missing worm: {}", id, e),
            }
        }

        Some(Detonation { bomb: id, damaged })
    }

    // ---- snapshots ----

    pub fn worm_views(&self) -> Vec<WormView> {
        self.worms.values().map(Worm::view).collect()
    }

    pub fn bomb_views(&self) -> Vec<BombView> {
        self.bombs.values().map(Bomb::view).collect()
    }

    pub fn food_positions(&self) -> Vec<Position> {
        self.grid.food_positions()
    }

    /// Every occupied cell belongs to a live worm covering it, and every
    /// worm segment is marked as occupied by that worm.
    pub fn is_consistent(&self) -> bool {
        let cells_ok = self.grid.iter().all(|(pos, cell)| match cell.occupant {
            Some(id) => self.worms.get(&id).is_some_and(|w| w.covers(pos)),
            None => true,
        });
        let bodies_ok = self.worms.values().all(|worm| {
            worm.body()
                .iter()
                .all(|&pos| self.grid.cell(pos).occupant == Some(worm.id()))
        });
        cells_ok && bodies_ok
    }
}
