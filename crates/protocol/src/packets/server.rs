//! Server -> Client message building.

use super::Event;
use crate::{BombId, Position, WormId, write_position, write_positions};
use std::fmt::Write;

/// A worm as it appears on the wire: `id,positions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WormView {
    pub id: WormId,
    pub positions: Vec<Position>,
}

impl WormView {
    fn write(&self, out: &mut String) {
        let _ = write!(out, "{},", self.id);
        write_positions(out, &self.positions);
    }
}

/// A live bomb as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BombView {
    pub id: BombId,
    pub seconds_left: u32,
    pub center: Position,
    pub blast_cells: Vec<Position>,
}

/// Full world state sent in reply to `INIT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The requesting client's own worm.
    pub own: WormView,
    pub others: Vec<WormView>,
    pub food: Vec<Position>,
    pub bombs: Vec<BombView>,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Reply to `INIT`.
    Init(Snapshot),
    /// Broadcast to everyone but the new worm's owner.
    NewWorm(WormView),
    /// Every worm's body after a movement tick.
    Move(Vec<WormView>),
    ConsumeFood {
        worm: WormId,
        position: Position,
        consumed: u32,
        needed: u32,
    },
    /// `position` is the appended tail segment.
    Extend { worm: WormId, position: Position },
    SpawnFood(Vec<Position>),
    SpawnBomb(BombView),
    /// Bodies of every worm the blast damaged.
    DetonateBomb { bomb: BombId, worms: Vec<WormView> },
    /// Sent only to the owner of a worm that shrank in a collision.
    Collide { consumed: u32, needed: u32 },
    Disconnect(WormId),
}

impl ServerMessage {
    pub fn event(&self) -> Event {
        match self {
            ServerMessage::Init(_) => Event::Init,
            ServerMessage::NewWorm(_) => Event::NewWorm,
            ServerMessage::Move(_) => Event::Move,
            ServerMessage::ConsumeFood { .. } => Event::ConsumeFood,
            ServerMessage::Extend { .. } => Event::Extend,
            ServerMessage::SpawnFood(_) => Event::SpawnFood,
            ServerMessage::SpawnBomb(_) => Event::SpawnBomb,
            ServerMessage::DetonateBomb { .. } => Event::DetonateBomb,
            ServerMessage::Collide { .. } => Event::Collide,
            ServerMessage::Disconnect(_) => Event::Disconnect,
        }
    }

    /// Encode into a text frame.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(self.event().as_str());
        out.push('\n');

        match self {
            ServerMessage::Init(snapshot) => {
                snapshot.own.write(&mut out);
                out.push('|');
                write_worm_lines(&mut out, &snapshot.others);
                out.push('|');
                write_positions(&mut out, &snapshot.food);
                out.push('|');
                for (i, bomb) in snapshot.bombs.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    let _ = write!(out, "{},{},", bomb.id, bomb.seconds_left);
                    write_position(&mut out, bomb.center);
                    out.push(',');
                    write_positions(&mut out, &bomb.blast_cells);
                }
            }
            ServerMessage::NewWorm(worm) => worm.write(&mut out),
            ServerMessage::Move(worms) => write_worm_lines(&mut out, worms),
            ServerMessage::ConsumeFood {
                worm,
                position,
                consumed,
                needed,
            } => {
                let _ = write!(out, "{},", worm);
                write_position(&mut out, *position);
                let _ = write!(out, "|{}/{}", consumed, needed);
            }
            ServerMessage::Extend { worm, position } => {
                let _ = write!(out, "{},", worm);
                write_position(&mut out, *position);
            }
            ServerMessage::SpawnFood(positions) => write_positions(&mut out, positions),
            ServerMessage::SpawnBomb(bomb) => {
                let _ = write!(out, "{}|{}|", bomb.id, bomb.seconds_left);
                write_position(&mut out, bomb.center);
                out.push('|');
                write_positions(&mut out, &bomb.blast_cells);
            }
            ServerMessage::DetonateBomb { bomb, worms } => {
                let _ = write!(out, "{}", bomb);
                if !worms.is_empty() {
                    out.push('|');
                    write_worm_lines(&mut out, worms);
                }
            }
            ServerMessage::Collide { consumed, needed } => {
                let _ = write!(out, "{}/{}", consumed, needed);
            }
            ServerMessage::Disconnect(worm) => {
                let _ = write!(out, "{}", worm);
            }
        }

        out
    }
}

fn write_worm_lines(out: &mut String, worms: &[WormView]) {
    for (i, worm) in worms.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        worm.write(out);
    }
}
