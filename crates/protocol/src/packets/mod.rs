//! Message definitions for the wormo protocol.
//!
//! Every frame is an event name optionally followed by `\n` and a payload.
//! This module contains both client->server and server->client messages.

mod client;
mod server;

pub use client::*;
pub use server::*;

use crate::ProtocolError;

/// Event names carried in the first line of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Session start (client) / world snapshot (server).
    Init,
    /// Another worm joined.
    NewWorm,
    /// Per-tick worm bodies.
    Move,
    /// A worm ate a food item.
    ConsumeFood,
    /// New food items on the grid.
    SpawnFood,
    /// A bomb was placed.
    SpawnBomb,
    /// A bomb went off.
    DetonateBomb,
    /// A worm grew by one segment.
    Extend,
    /// Direction change request.
    ChangeDirection,
    /// Own worm shrank after hitting something.
    Collide,
    /// A worm left.
    Disconnect,
}

impl Event {
    pub const fn as_str(self) -> &'static str {
        match self {
            Event::Init => "INIT",
            Event::NewWorm => "NEW",
            Event::Move => "MOVE",
            Event::ConsumeFood => "CONSUMEFOOD",
            Event::SpawnFood => "SPAWNFOOD",
            Event::SpawnBomb => "SPAWNBOMB",
            Event::DetonateBomb => "DETBOMB",
            Event::Extend => "EXTEND",
            Event::ChangeDirection => "CHANGEDIR",
            Event::Collide => "COLLIDE",
            Event::Disconnect => "DISCONNECT",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        Ok(match s {
            "INIT" => Event::Init,
            "NEW" => Event::NewWorm,
            "MOVE" => Event::Move,
            "CONSUMEFOOD" => Event::ConsumeFood,
            "SPAWNFOOD" => Event::SpawnFood,
            "SPAWNBOMB" => Event::SpawnBomb,
            "DETBOMB" => Event::DetonateBomb,
            "EXTEND" => Event::Extend,
            "CHANGEDIR" => Event::ChangeDirection,
            "COLLIDE" => Event::Collide,
            "DISCONNECT" => Event::Disconnect,
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        })
    }
}

/// Split a frame into its event name and optional payload.
pub fn split_frame(frame: &str) -> (&str, Option<&str>) {
    match frame.split_once('\n') {
        Some((event, data)) => (event.trim_end_matches('\r'), Some(data)),
        None => (frame.trim_end(), None),
    }
}
