//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown event: {0:?}")]
    UnknownEvent(String),

    #[error("Event {0} requires a payload")]
    MissingData(&'static str),

    #[error("Invalid direction: {0:?}")]
    InvalidDirection(String),

    #[error("Invalid position: {0:?}")]
    InvalidPosition(String),

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),
}
