use crate::location::ZoneName;
use thiserror::Error;

/// Reasons the host gives for rejecting a construction order.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum OrderError {
    #[error("target tile is not valid for this structure")]
    InvalidTarget,
    #[error("too many open construction orders")]
    Full,
    #[error("zone tier too low for another structure of this type")]
    TierTooLow,
    #[error("zone is not owned")]
    NotOwner,
    #[error("no such construction order")]
    NotFound,
}

/// Unexpected failures that abort a zone's pass for the current tick.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("zone {0} is not visible")]
    ZoneNotVisible(ZoneName),
    #[error("zone {0} has no usable anchor position")]
    NoAnchor(ZoneName),
    #[error("planner memory could not be (de)serialized: {0}")]
    Memory(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum PositionParseError {
    #[error("malformed position entry '{0}'")]
    Malformed(String),
    #[error("position ({0}, {1}) is outside the zone")]
    OutOfBounds(u8, u8),
}
