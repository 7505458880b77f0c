//! Timed loops driving the world.
//!
//! Movement, food and bomb placement each run on their own interval. Every
//! bomb gets a countdown task that ticks once a second until it detonates.

use super::game::GameState;
use crate::world::BombTick;
use protocol::BombId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Start the movement, food and bomb loops.
pub fn spawn_tickers(state: &Arc<RwLock<GameState>>, movement: Duration, food: Duration, bomb: Duration) {
    info!(
        "Tick intervals: movement {:?}, food {:?}, bombs {:?}",
        movement, food, bomb
    );
    tokio::spawn(run_movement_loop(Arc::clone(state), movement));
    tokio::spawn(run_food_loop(Arc::clone(state), food));
    tokio::spawn(run_bomb_loop(Arc::clone(state), bomb));
}

/// Advance every worm once per period.
pub async fn run_movement_loop(state: Arc<RwLock<GameState>>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let mut game = state.write().await;
        if let Err(e) = game.movement_tick() {
            error!("Movement tick failed: {}", e);
        }
    }
}

/// Scatter food once per period.
pub async fn run_food_loop(state: Arc<RwLock<GameState>>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let placed = {
            let mut game = state.write().await;
            game.food_tick(&mut rand::rng())
        };
        if placed > 0 {
            debug!("Spawned {} food", placed);
        }
    }
}

/// Place a bomb once per period and start its countdown.
pub async fn run_bomb_loop(state: Arc<RwLock<GameState>>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let bomb = {
            let mut game = state.write().await;
            game.bomb_tick(&mut rand::rng())
        };
        if let Some(id) = bomb {
            tokio::spawn(run_bomb_countdown(Arc::clone(&state), id));
        }
    }
}

/// Count a bomb down one second at a time until it goes off.
pub async fn run_bomb_countdown(state: Arc<RwLock<GameState>>, id: BombId) {
    let mut ticker = ticker(COUNTDOWN_STEP);
    loop {
        ticker.tick().await;
        match state.write().await.bomb_countdown(id) {
            BombTick::Counting(left) => debug!("Bomb {}: {}s left", id, left),
            BombTick::Detonated(_) | BombTick::Gone => break,
        }
    }
}
