//! Collision detection for the movement tick.
//!
//! Every worm's outcome is planned from the same start-of-tick state before
//! anything is committed, so the order worms are visited in never matters:
//! - Wall collisions (head would leave the grid)
//! - Ties (two heads aiming at one cell, or a head aiming at another head)
//! - Worm-vs-worm hits (head aiming into another worm's body)
//!
//! A worm moving onto its own body is not a collision: the tail follows.

use crate::entity::Worm;
use crate::spatial::Grid;
use protocol::{Position, WormId};
use std::collections::{BTreeMap, HashMap};

/// What happens to one worm this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Move the head onto this cell.
    Advance(Position),
    /// Head would leave the grid; lose `loss` segments and stay put.
    Wall { loss: usize },
    /// Contested cell; nobody moves and nobody changes length.
    Tie,
    /// Ran into `victim`'s body; lose `loss` segments, `victim` gains them.
    Hit { victim: WormId, loss: usize },
    /// Target is another body but the worm is too short to lose anything.
    Blocked,
}

/// All outcomes for one tick plus growth owed to hit worms.
#[derive(Debug, Default)]
pub struct TickPlan {
    pub outcomes: Vec<(WormId, Outcome)>,
    pub gains: BTreeMap<WormId, usize>,
}

/// Plan a movement tick for `worms` on `grid`.
pub fn plan_tick<'a>(grid: &Grid, worms: impl IntoIterator<Item = &'a Worm>) -> TickPlan {
    let worms: Vec<&Worm> = worms.into_iter().collect();

    let targets: Vec<Option<Position>> = worms
        .iter()
        .map(|w| grid.step(w.head(), w.direction()))
        .collect();

    let mut claims: HashMap<Position, usize> = HashMap::with_capacity(worms.len());
    for target in targets.iter().flatten() {
        *claims.entry(*target).or_insert(0) += 1;
    }

    let heads: HashMap<Position, WormId> = worms.iter().map(|w| (w.head(), w.id())).collect();

    let mut plan = TickPlan::default();
    for (worm, target) in worms.iter().zip(targets) {
        let outcome = check_move(grid, worm, target, &claims, &heads);
        if let Outcome::Hit { victim, loss } = outcome {
            *plan.gains.entry(victim).or_insert(0) += loss;
        }
        plan.outcomes.push((worm.id(), outcome));
    }
    plan
}

fn check_move(
    grid: &Grid,
    worm: &Worm,
    target: Option<Position>,
    claims: &HashMap<Position, usize>,
    heads: &HashMap<Position, WormId>,
) -> Outcome {
    let Some(target) = target else {
        return Outcome::Wall { loss: worm.len() / 2 };
    };

    if claims.get(&target).copied().unwrap_or(0) > 1 {
        return Outcome::Tie;
    }
    // Another head's cell is contested even when its owner moves off it.
    if heads.get(&target).is_some_and(|&other| other != worm.id()) {
        return Outcome::Tie;
    }

    match grid.cell(target).occupant {
        Some(other) if other != worm.id() => {
            if worm.len() > 1 {
                Outcome::Hit {
                    victim: other,
                    loss: worm.len() / 2,
                }
            } else {
                Outcome::Blocked
            }
        }
        _ => Outcome::Advance(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Direction;

    fn place(grid: &mut Grid, id: u64, cells: &[(u32, u32)], direction: Direction) -> Worm {
        let body: Vec<Position> = cells.iter().map(|&(x, y)| Position::new(x, y)).collect();
        for &pos in &body {
            grid.set_occupant(pos, Some(WormId(id)));
        }
        Worm::new(WormId(id), body, direction, 1)
    }

    fn outcome_of(plan: &TickPlan, id: u64) -> Outcome {
        plan.outcomes
            .iter()
            .find(|(w, _)| *w == WormId(id))
            .map(|(_, o)| *o)
            .unwrap()
    }

    #[test]
    fn test_wall() {
        let mut grid = Grid::new(12, 12);
        let worm = place(&mut grid, 1, &[(0, 3), (1, 3), (2, 3), (3, 3), (4, 3)], Direction::Left);
        let plan = plan_tick(&grid, [&worm]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Wall { loss: 2 });
    }

    #[test]
    fn test_hit_credits_victim() {
        let mut grid = Grid::new(12, 12);
        let a = place(&mut grid, 1, &[(2, 4), (1, 4), (0, 4)], Direction::Right);
        let b = place(&mut grid, 2, &[(3, 2), (3, 3), (3, 4), (3, 5)], Direction::Up);
        let plan = plan_tick(&grid, [&a, &b]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Hit { victim: WormId(2), loss: 1 });
        assert_eq!(plan.gains.get(&WormId(2)), Some(&1));
    }

    #[test]
    fn test_shared_target_is_tie() {
        let mut grid = Grid::new(12, 12);
        let a = place(&mut grid, 1, &[(4, 5), (3, 5)], Direction::Right);
        let b = place(&mut grid, 2, &[(6, 5), (7, 5)], Direction::Left);
        let plan = plan_tick(&grid, [&a, &b]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Tie);
        assert_eq!(outcome_of(&plan, 2), Outcome::Tie);
        assert!(plan.gains.is_empty());
    }

    #[test]
    fn test_head_swap_is_tie() {
        let mut grid = Grid::new(12, 12);
        let a = place(&mut grid, 1, &[(4, 5), (3, 5)], Direction::Right);
        let b = place(&mut grid, 2, &[(5, 5), (6, 5)], Direction::Left);
        let plan = plan_tick(&grid, [&b, &a]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Tie);
        assert_eq!(outcome_of(&plan, 2), Outcome::Tie);
    }

    #[test]
    fn test_own_body_is_not_a_collision() {
        let mut grid = Grid::new(12, 12);
        // Curled so that moving up lands on its own tail.
        let worm = place(&mut grid, 1, &[(5, 5), (6, 5), (6, 4), (5, 4)], Direction::Up);
        let plan = plan_tick(&grid, [&worm]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Advance(Position::new(5, 4)));
    }

    #[test]
    fn test_single_segment_is_blocked() {
        let mut grid = Grid::new(12, 12);
        let a = place(&mut grid, 1, &[(2, 2)], Direction::Down);
        let b = place(&mut grid, 2, &[(1, 3), (2, 3), (3, 3)], Direction::Left);
        let plan = plan_tick(&grid, [&a, &b]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Blocked);
        assert_eq!(outcome_of(&plan, 2), Outcome::Advance(Position::new(0, 3)));
    }

    #[test]
    fn test_following_a_moving_head_is_tie() {
        let mut grid = Grid::new(12, 12);
        let leader = place(&mut grid, 1, &[(5, 5), (5, 6)], Direction::Up);
        let follower = place(&mut grid, 2, &[(4, 5), (3, 5)], Direction::Right);
        let plan = plan_tick(&grid, [&leader, &follower]);
        assert_eq!(outcome_of(&plan, 1), Outcome::Advance(Position::new(5, 4)));
        assert_eq!(outcome_of(&plan, 2), Outcome::Tie);
        assert!(plan.gains.is_empty());
    }
}
