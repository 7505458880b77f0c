//! Text encoding for positions.
//!
//! A position is written as `x:y` and a list of positions is comma-joined.

use std::fmt::Write;

use crate::{Position, ProtocolError};

/// Append `x:y` to `out`.
#[inline]
pub fn write_position(out: &mut String, pos: Position) {
    // Writing to a String cannot fail.
    let _ = write!(out, "{}:{}", pos.x, pos.y);
}

/// Append a comma-joined position list to `out`.
pub fn write_positions(out: &mut String, positions: &[Position]) {
    for (i, pos) in positions.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_position(out, *pos);
    }
}

pub(crate) fn parse_number(s: &str) -> Result<u32, ProtocolError> {
    s.trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(s.to_string()))
}

/// Parse a single `x:y` position.
pub fn parse_position(s: &str) -> Result<Position, ProtocolError> {
    let (x, y) = s
        .split_once(':')
        .ok_or_else(|| ProtocolError::InvalidPosition(s.to_string()))?;
    Ok(Position::new(parse_number(x)?, parse_number(y)?))
}

/// Parse a comma-joined position list. An empty string is an empty list.
pub fn parse_positions(s: &str) -> Result<Vec<Position>, ProtocolError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(parse_position).collect()
}
