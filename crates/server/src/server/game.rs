//! Shared game state and its transitions.
//!
//! `GameState` lives behind one `RwLock`. Every method below runs inside a
//! single lock acquisition and queues its broadcasts before returning.

use crate::config::Config;
use crate::world::{BombTick, World};
use protocol::packets::{ServerMessage, Snapshot, WormView};
use protocol::{BombId, Direction, WormId};
use rand::Rng;
use std::net::SocketAddr;
use tracing::{debug, error, info};

use super::client::{Client, Clients, ConnectionId, Outbox};

pub struct GameState {
    pub config: Config,
    pub world: World,
    pub clients: Clients,
    next_connection_id: ConnectionId,
}

impl GameState {
    pub fn new(config: Config) -> Self {
        let world = World::new(
            config.grid.width,
            config.grid.height,
            config.grid.level_multiplier,
        );
        Self {
            config,
            world,
            clients: Clients::default(),
            next_connection_id: 1,
        }
    }

    /// Spawn a worm for a new connection and register it.
    pub fn add_client(&mut self, addr: SocketAddr, outbox: Outbox) -> anyhow::Result<ConnectionId> {
        let worm = self.world.spawn_worm(&mut rand::rng())?;
        let id = self.next_connection_id;
        self.next_connection_id += 1;

        self.clients.insert(Client::new(id, addr, worm, outbox));
        info!(
            "Client {} ({}) joined as worm {} ({} online)",
            id,
            addr,
            worm,
            self.clients.len()
        );
        Ok(id)
    }

    /// Drop a connection and its worm, then tell everyone it left.
    pub fn remove_client(&mut self, id: ConnectionId) -> Option<WormId> {
        let client = self.clients.remove(id)?;
        let removed = self.world.remove_worm(client.worm);
        debug_assert!(removed.is_ok(), "client {id} had no worm to remove");
        if let Err(e) = removed {
            error!("Client {} had no worm to remove: {}", id, e);
        }
        info!(
            "Client {} ({}) left after {:?}",
            id,
            client.addr,
            client.connected_at.elapsed()
        );

        self.clients.broadcast_all(&ServerMessage::Disconnect(client.worm));
        Some(client.worm)
    }

    fn worm_of(&self, id: ConnectionId) -> anyhow::Result<WormId> {
        self.clients
            .get(id)
            .map(|client| client.worm)
            .ok_or_else(|| anyhow::anyhow!("Client {} not found", id))
    }

    /// Reply to `INIT` with the whole world and announce the worm to the rest.
    pub fn handle_init(&self, id: ConnectionId) -> anyhow::Result<()> {
        let worm_id = self.worm_of(id)?;
        let own = self
            .world
            .worm(worm_id)
            .map(|w| w.view())
            .ok_or_else(|| anyhow::anyhow!("Worm {} of client {} not found", worm_id, id))?;

        let snapshot = Snapshot {
            own: own.clone(),
            others: self
                .world
                .worms()
                .filter(|w| w.id() != worm_id)
                .map(|w| w.view())
                .collect(),
            food: self.world.food_positions(),
            bombs: self.world.bomb_views(),
        };

        self.clients.send_to(id, &ServerMessage::Init(snapshot));
        self.clients.broadcast_except(&ServerMessage::NewWorm(own), id);
        Ok(())
    }

    /// Store a new heading; it takes effect on the next movement tick.
    pub fn change_direction(&mut self, id: ConnectionId, direction: Direction) -> anyhow::Result<()> {
        let worm = self.worm_of(id)?;
        self.world.set_direction(worm, direction)?;
        Ok(())
    }

    /// Move every worm one cell and broadcast the results.
    pub fn movement_tick(&mut self) -> anyhow::Result<()> {
        if self.clients.is_empty() {
            return Ok(());
        }

        let report = self.world.step()?;

        for worm in report.collided {
            let Some(client) = self.clients.by_worm(worm) else {
                continue;
            };
            if let Some(w) = self.world.worm(worm) {
                let msg = ServerMessage::Collide {
                    consumed: w.food_consumed(),
                    needed: w.food_needed(),
                };
                self.clients.send_to(client.id, &msg);
            }
        }

        for meal in report.meals {
            self.clients.broadcast_all(&ServerMessage::ConsumeFood {
                worm: meal.worm,
                position: meal.position,
                consumed: meal.consumed,
                needed: meal.needed,
            });
        }

        for (worm, position) in report.extensions {
            self.clients
                .broadcast_all(&ServerMessage::Extend { worm, position });
        }

        let worms = self.world.worm_views();
        if !worms.is_empty() {
            self.clients.broadcast_all(&ServerMessage::Move(worms));
        }
        Ok(())
    }

    /// Scatter a few food items. Returns how many were placed.
    pub fn food_tick<R: Rng>(&mut self, rng: &mut R) -> usize {
        if self.clients.is_empty() {
            return 0;
        }

        let count = 1 + rng.random_range(0..=self.config.food.max_extra_per_spawn);
        let placed = self.world.spawn_food(rng, count, self.config.food.probes);
        if placed.is_empty() {
            debug!("No free cell found for {} food items", count);
            return 0;
        }

        let n = placed.len();
        self.clients.broadcast_all(&ServerMessage::SpawnFood(placed));
        n
    }

    /// Place a bomb if anyone is playing. The caller drives its countdown.
    pub fn bomb_tick<R: Rng>(&mut self, rng: &mut R) -> Option<BombId> {
        if self.clients.is_empty() {
            return None;
        }

        let bomb = self.world.spawn_bomb(rng, &self.config.bomb).view();
        debug!(
            "Bomb {} at {} detonates in {}s",
            bomb.id, bomb.center, bomb.seconds_left
        );
        let id = bomb.id;
        self.clients.broadcast_all(&ServerMessage::SpawnBomb(bomb));
        Some(id)
    }

    /// One second of a bomb's countdown; broadcasts the blast when it goes off.
    pub fn bomb_countdown(&mut self, id: BombId) -> BombTick {
        let tick = self.world.tick_bomb(id);
        if let BombTick::Detonated(detonation) = &tick {
            let worms: Vec<WormView> = detonation
                .damaged
                .iter()
                .filter_map(|&w| self.world.worm(w).map(|w| w.view()))
                .collect();
            debug!("Bomb {} detonated, {} worms hit", id, worms.len());
            self.clients.broadcast_all(&ServerMessage::DetonateBomb { bomb: id, worms });
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Position;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use tokio::sync::{RwLock, mpsc};

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn connect(game: &mut GameState) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = game.add_client(addr(), tx).unwrap();
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_init_snapshot_and_new_broadcast() {
        let mut game = GameState::new(Config::default());
        let (a, mut a_rx) = connect(&mut game);
        let (b, mut b_rx) = connect(&mut game);
        let worm_a = game.clients.get(a).unwrap().worm;
        let worm_b = game.clients.get(b).unwrap().worm;

        game.handle_init(b).unwrap();

        let reply = drain(&mut b_rx);
        assert_eq!(reply.len(), 1);
        let body = reply[0].strip_prefix("INIT\n").unwrap();
        let sections: Vec<&str> = body.split('|').collect();
        assert_eq!(sections.len(), 4);
        assert!(sections[0].starts_with(&format!("{},", worm_b)));
        assert!(sections[1].starts_with(&format!("{},", worm_a)));

        let announced = drain(&mut a_rx);
        assert_eq!(announced.len(), 1);
        assert!(announced[0].starts_with(&format!("NEW\n{},", worm_b)));
    }

    #[test]
    fn test_change_direction_applies_next_tick() {
        let mut game = GameState::new(Config::default());
        let (a, mut rx) = connect(&mut game);
        let worm = game.clients.get(a).unwrap().worm;
        let head = game.world.worm(worm).unwrap().head();

        game.change_direction(a, Direction::Down).unwrap();
        assert_eq!(game.world.worm(worm).unwrap().head(), head);

        game.movement_tick().unwrap();
        let body = game.world.worm(worm).unwrap().body().to_vec();
        assert_eq!(body[0], Position::new(head.x, head.y + 1));
        assert_eq!(body[1], head);

        let mut expected = format!("MOVE\n{},", worm);
        protocol::write_positions(&mut expected, &body);
        assert_eq!(drain(&mut rx), vec![expected]);
    }

    #[test]
    fn test_unknown_client_is_an_error() {
        let mut game = GameState::new(Config::default());
        assert!(game.handle_init(42).is_err());
        assert!(game.change_direction(42, Direction::Up).is_err());
    }

    #[test]
    fn test_remove_client_broadcasts_disconnect() {
        let mut game = GameState::new(Config::default());
        let (a, _a_rx) = connect(&mut game);
        let (_b, mut b_rx) = connect(&mut game);
        let worm = game.clients.get(a).unwrap().worm;

        assert_eq!(game.remove_client(a), Some(worm));
        assert!(game.world.worm(worm).is_none());
        assert_eq!(drain(&mut b_rx), vec![format!("DISCONNECT\n{}", worm)]);
        assert!(game.world.is_consistent());
        assert_eq!(game.remove_client(a), None);
    }

    #[test]
    fn test_wall_hit_notifies_owner_only() {
        let mut game = GameState::new(Config::default());
        let cells = |list: &[(u32, u32)]| list.iter().map(|&(x, y)| Position::new(x, y)).collect();
        let stuck = game.world.insert_worm(cells(&[(0, 3), (1, 3), (2, 3)]), Direction::Left);
        let free = game.world.insert_worm(cells(&[(20, 10), (19, 10), (18, 10)]), Direction::Right);

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        game.clients.insert(Client::new(1, addr(), stuck, a_tx));
        game.clients.insert(Client::new(2, addr(), free, b_tx));

        game.movement_tick().unwrap();

        let a_msgs = drain(&mut a_rx);
        let b_msgs = drain(&mut b_rx);
        assert_eq!(a_msgs[0], "COLLIDE\n0/2");
        assert!(a_msgs[1].starts_with("MOVE\n"));
        assert_eq!(b_msgs.len(), 1);
        assert!(b_msgs[0].starts_with("MOVE\n"));
        assert_eq!(game.world.worm(stuck).unwrap().len(), 2);
        assert_eq!(game.world.worm(free).unwrap().head(), Position::new(21, 10));
    }

    fn attach(game: &mut GameState, id: ConnectionId, worm: WormId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        game.clients.insert(Client::new(id, addr(), worm, tx));
        rx
    }

    fn row(head_x: u32, y: u32, len: u32) -> Vec<Position> {
        (0..len).map(|i| Position::new(head_x - i, y)).collect()
    }

    #[test]
    fn test_meals_and_growth_are_broadcast() {
        let mut game = GameState::new(Config::default());
        let worm = game.world.insert_worm(row(10, 5, 3), Direction::Right);
        let mut rx = attach(&mut game, 1, worm);
        for x in 11..=13 {
            assert!(game.world.place_food(Position::new(x, 5)));
        }

        let mut frames = Vec::new();
        for _ in 0..3 {
            game.movement_tick().unwrap();
            frames.extend(drain(&mut rx));
        }

        assert_eq!(
            frames,
            vec![
                format!("CONSUMEFOOD\n{worm},11:5|1/3"),
                format!("MOVE\n{worm},11:5,10:5,9:5"),
                format!("CONSUMEFOOD\n{worm},12:5|2/3"),
                format!("MOVE\n{worm},12:5,11:5,10:5"),
                format!("CONSUMEFOOD\n{worm},13:5|0/4"),
                format!("EXTEND\n{worm},11:5"),
                format!("MOVE\n{worm},13:5,12:5,11:5,11:5"),
            ]
        );
        assert!(game.world.food_positions().is_empty());
    }

    #[test]
    fn test_worm_hit_notifies_mover_and_extends_victim() {
        let mut game = GameState::new(Config::default());
        let mover = game.world.insert_worm(row(2, 4, 3), Direction::Right);
        let victim = game.world.insert_worm(
            vec![
                Position::new(3, 2),
                Position::new(3, 3),
                Position::new(3, 4),
                Position::new(3, 5),
            ],
            Direction::Up,
        );
        let mut mover_rx = attach(&mut game, 1, mover);
        let mut victim_rx = attach(&mut game, 2, victim);

        game.movement_tick().unwrap();

        let moves = format!("MOVE\n{mover},2:4,1:4\n{victim},3:1,3:2,3:3,3:4,3:4");
        let extend = format!("EXTEND\n{victim},3:4");
        assert_eq!(
            drain(&mut mover_rx),
            vec!["COLLIDE\n0/2".to_string(), extend.clone(), moves.clone()]
        );
        assert_eq!(drain(&mut victim_rx), vec![extend, moves]);
        assert_eq!(game.world.worm(victim).unwrap().len(), 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "had no worm to remove")]
    fn test_client_without_worm_fails_fast() {
        let mut game = GameState::new(Config::default());
        let _rx = attach(&mut game, 1, WormId(99));
        game.remove_client(1);
    }

    #[test]
    fn test_ticks_idle_without_clients() {
        let mut game = GameState::new(Config::default());
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(game.food_tick(&mut rng), 0);
        assert_eq!(game.bomb_tick(&mut rng), None);
        game.movement_tick().unwrap();
        assert!(game.world.food_positions().is_empty());
    }

    #[test]
    fn test_food_tick_broadcasts_positions() {
        let mut game = GameState::new(Config::default());
        let (_a, mut rx) = connect(&mut game);
        let mut rng = StdRng::seed_from_u64(4);

        let placed = game.food_tick(&mut rng);

        assert!((1..=5).contains(&placed));
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 1);
        let positions = protocol::parse_positions(msgs[0].strip_prefix("SPAWNFOOD\n").unwrap()).unwrap();
        assert_eq!(positions.len(), placed);
        assert_eq!(game.world.food_positions().len(), placed);
    }

    #[test]
    fn test_bomb_lifecycle_broadcasts() {
        let mut game = GameState::new(Config::default());
        let (_a, mut rx) = connect(&mut game);
        let mut rng = StdRng::seed_from_u64(8);

        let bomb = game.bomb_tick(&mut rng).unwrap();
        let seconds = game.world.bomb(bomb).unwrap().seconds_remaining();
        let spawn = drain(&mut rx);
        assert!(spawn[0].starts_with(&format!("SPAWNBOMB\n{}|{}|", bomb, seconds)));

        for _ in 1..seconds {
            assert!(matches!(game.bomb_countdown(bomb), BombTick::Counting(_)));
        }
        assert!(matches!(game.bomb_countdown(bomb), BombTick::Detonated(_)));
        let det = drain(&mut rx);
        assert!(det[0].starts_with(&format!("DETBOMB\n{}", bomb)));
        assert!(game.world.bomb(bomb).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_leave_no_orphans() {
        let mut config = Config::default();
        config.bomb.min_detonation_secs = 1;
        config.bomb.max_detonation_secs = 2;
        let state = Arc::new(RwLock::new(GameState::new(config)));

        let ticks = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(99);
                let mut bombs = Vec::new();
                for _ in 0..200 {
                    let mut game = state.write().await;
                    game.movement_tick().unwrap();
                    game.food_tick(&mut rng);
                    if let Some(bomb) = game.bomb_tick(&mut rng) {
                        bombs.push(bomb);
                    }
                    for &bomb in &bombs {
                        game.bomb_countdown(bomb);
                    }
                    drop(game);
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut sessions = Vec::new();
        for n in 0..16u64 {
            let state = Arc::clone(&state);
            sessions.push(tokio::spawn(async move {
                for round in 0..10u64 {
                    let (tx, _rx) = mpsc::unbounded_channel();
                    let id = state.write().await.add_client(addr(), tx).unwrap();
                    state.read().await.handle_init(id).unwrap();
                    let dir = match (n + round) % 4 {
                        0 => Direction::Up,
                        1 => Direction::Down,
                        2 => Direction::Left,
                        _ => Direction::Right,
                    };
                    state.write().await.change_direction(id, dir).unwrap();
                    tokio::task::yield_now().await;
                    state.write().await.remove_client(id);
                }
            }));
        }

        for session in sessions {
            session.await.unwrap();
        }
        ticks.await.unwrap();

        let game = state.read().await;
        assert!(game.clients.is_empty());
        assert_eq!(game.world.worms().count(), 0);
        assert!(game.world.grid().iter().all(|(_, cell)| cell.occupant.is_none()));
        assert!(game.world.is_consistent());
    }
}
