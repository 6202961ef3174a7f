use crate::constants::*;
use crate::error::PositionParseError;
use serde::*;
use std::fmt;

/// A tile inside a single zone, packed into 16 bits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Location {
    packed: u16,
}

impl Location {
    pub fn from_coords(x: u32, y: u32) -> Self {
        Location {
            packed: ((x << 8) | y) as u16,
        }
    }

    #[inline]
    pub fn from_xy(x: u8, y: u8) -> Self {
        Self::from_coords(x as u32, y as u32)
    }

    #[inline]
    pub fn x(self) -> u8 {
        ((self.packed >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn y(self) -> u8 {
        (self.packed & 0xFF) as u8
    }

    #[inline]
    pub fn packed_repr(self) -> u16 {
        self.packed
    }

    #[inline]
    pub fn from_packed(packed: u16) -> Self {
        Location { packed }
    }

    /// Chebyshev (king-move) distance.
    pub fn distance_to(self, other: Self) -> u8 {
        let dx = (self.x() as i16) - (other.x() as i16);
        let dy = (self.y() as i16) - (other.y() as i16);

        dx.abs().max(dy.abs()) as u8
    }

    /// Offset this location, returning `None` if the result leaves the zone.
    pub fn checked_add(self, dx: i8, dy: i8) -> Option<Location> {
        let x = self.x() as i16 + dx as i16;
        let y = self.y() as i16 + dy as i16;
        if in_zone_bounds(x, y) {
            Some(Location::from_coords(x as u32, y as u32))
        } else {
            None
        }
    }

    pub fn is_interior(self) -> bool {
        in_interior(self.x() as i16, self.y() as i16)
    }

    pub fn is_edge(self) -> bool {
        self.x() == 0 || self.y() == 0 || self.x() == ZONE_WIDTH - 1 || self.y() == ZONE_HEIGHT - 1
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.y())
    }
}

impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.packed_repr().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u16::deserialize(deserializer).map(Location::from_packed)
    }
}

/// Identity of a zone.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneName(String);

impl ZoneName {
    pub fn new(name: impl Into<String>) -> Self {
        ZoneName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneName {
    fn from(name: &str) -> Self {
        ZoneName::new(name)
    }
}

/// A tile position that also names its zone. Pure data: spatial queries live
/// in [`crate::pathing`] and take this by reference.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ZonePosition {
    pub x: u8,
    pub y: u8,
    pub zone: ZoneName,
}

impl ZonePosition {
    pub fn new(x: u8, y: u8, zone: ZoneName) -> Self {
        ZonePosition { x, y, zone }
    }

    pub fn at(location: Location, zone: ZoneName) -> Self {
        ZonePosition {
            x: location.x(),
            y: location.y(),
            zone,
        }
    }

    pub fn location(&self) -> Location {
        Location::from_xy(self.x, self.y)
    }
}

const LIST_SEPARATOR: char = ';';
const COORD_SEPARATOR: char = ',';

/// Encode a list of tiles as `x,y;x,y;...`.
pub fn encode_locations(locations: &[Location]) -> String {
    locations
        .iter()
        .map(|l| format!("{}{}{}", l.x(), COORD_SEPARATOR, l.y()))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// Inverse of [`encode_locations`]. Order is preserved.
pub fn decode_locations(encoded: &str) -> Result<Vec<Location>, PositionParseError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    encoded
        .split(LIST_SEPARATOR)
        .map(|entry| {
            let (x, y) = entry
                .split_once(COORD_SEPARATOR)
                .ok_or_else(|| PositionParseError::Malformed(entry.to_string()))?;
            let x: u8 = x
                .trim()
                .parse()
                .map_err(|_| PositionParseError::Malformed(entry.to_string()))?;
            let y: u8 = y
                .trim()
                .parse()
                .map_err(|_| PositionParseError::Malformed(entry.to_string()))?;
            if x >= ZONE_WIDTH || y >= ZONE_HEIGHT {
                return Err(PositionParseError::OutOfBounds(x, y));
            }
            Ok(Location::from_xy(x, y))
        })
        .collect()
}
