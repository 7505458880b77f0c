//! Client -> Server message parsing.

use super::{Event, split_frame};
use crate::{Direction, ProtocolError};

/// Parsed client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Request the world snapshot (INIT).
    Init,
    /// Change heading (CHANGEDIR).
    ChangeDirection(Direction),
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let (event, data) = split_frame(frame);

        match Event::parse(event)? {
            Event::Init => Ok(ClientMessage::Init),
            Event::ChangeDirection => {
                let data = data.ok_or(ProtocolError::MissingData(Event::ChangeDirection.as_str()))?;
                Ok(ClientMessage::ChangeDirection(Direction::parse(data)?))
            }
            // Everything else is server-driven.
            other => Err(ProtocolError::UnknownEvent(other.as_str().to_string())),
        }
    }

    /// Encode as a text frame (used by clients and tests).
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::Init => Event::Init.as_str().to_string(),
            ClientMessage::ChangeDirection(dir) => {
                format!("{}\n{}", Event::ChangeDirection.as_str(), dir.as_char())
            }
        }
    }
}
