use crate::constants::*;
use crate::location::*;
use bitflags::*;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TerrainFlags: u8 {
        const NONE = 0;
        const WALL = 1;
        const SWAMP = 2;
    }
}

/// Terrain classification of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Open,
    Wall,
    Swamp,
    Exit,
}

/// Raw terrain of one zone, one byte of `TerrainFlags` per tile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneTerrain {
    buffer: Vec<u8>,
}

impl ZoneTerrain {
    pub fn new(buffer: Vec<u8>) -> ZoneTerrain {
        ZoneTerrain { buffer }
    }

    /// All-plain terrain.
    pub fn plain() -> ZoneTerrain {
        ZoneTerrain {
            buffer: vec![0; (ZONE_WIDTH as usize) * (ZONE_HEIGHT as usize)],
        }
    }

    /// Plain terrain walled in on every edge.
    pub fn enclosed() -> ZoneTerrain {
        let mut terrain = Self::plain();
        for i in 0..ZONE_WIDTH {
            terrain.set_xy(i, 0, TerrainFlags::WALL);
            terrain.set_xy(i, ZONE_HEIGHT - 1, TerrainFlags::WALL);
            terrain.set_xy(0, i, TerrainFlags::WALL);
            terrain.set_xy(ZONE_WIDTH - 1, i, TerrainFlags::WALL);
        }
        terrain
    }

    pub fn get(&self, pos: &Location) -> TerrainFlags {
        self.get_xy(pos.x(), pos.y())
    }

    pub fn get_xy(&self, x: u8, y: u8) -> TerrainFlags {
        let index = (y as usize * ZONE_WIDTH as usize) + (x as usize);
        TerrainFlags::from_bits_truncate(self.buffer[index])
    }

    pub fn set_xy(&mut self, x: u8, y: u8, flags: TerrainFlags) {
        let index = (y as usize * ZONE_WIDTH as usize) + (x as usize);
        self.buffer[index] = flags.bits();
    }

    pub fn is_wall(&self, x: u8, y: u8) -> bool {
        self.get_xy(x, y).contains(TerrainFlags::WALL)
    }

    pub fn is_wall_at(&self, loc: Location) -> bool {
        self.is_wall(loc.x(), loc.y())
    }

    pub fn is_swamp(&self, x: u8, y: u8) -> bool {
        self.get_xy(x, y).contains(TerrainFlags::SWAMP)
    }

    pub fn tile_kind(&self, loc: Location) -> TileKind {
        if self.is_wall_at(loc) {
            TileKind::Wall
        } else if loc.is_edge() {
            TileKind::Exit
        } else if self.is_swamp(loc.x(), loc.y()) {
            TileKind::Swamp
        } else {
            TileKind::Open
        }
    }

    /// Border tiles units can leave the zone through, in row order.
    pub fn get_exits(&self) -> Vec<Location> {
        zone_locations()
            .filter(|loc| loc.is_edge() && !self.is_wall_at(*loc))
            .collect()
    }
}

/// Every tile of a zone, row by row.
pub fn zone_locations() -> impl Iterator<Item = Location> {
    (0..ZONE_HEIGHT).flat_map(|y| (0..ZONE_WIDTH).map(move |x| Location::from_xy(x, y)))
}

const ZONE_AREA: usize = (ZONE_WIDTH as usize) * (ZONE_HEIGHT as usize);

fn grid_index(loc: Location) -> usize {
    loc.y() as usize * ZONE_WIDTH as usize + loc.x() as usize
}

/// Per-tile values for one zone, addressed by `Location`. Persists as a
/// flat row-major list and refuses lists of the wrong length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<T>",
    into = "Vec<T>",
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct ZoneGrid<T: Copy> {
    tiles: Vec<T>,
}

impl<T: Copy> ZoneGrid<T> {
    pub fn new(initial: T) -> Self {
        ZoneGrid {
            tiles: vec![initial; ZONE_AREA],
        }
    }

    /// Grid filled by evaluating `f` on every tile.
    pub fn from_fn(f: impl FnMut(Location) -> T) -> Self {
        ZoneGrid {
            tiles: zone_locations().map(f).collect(),
        }
    }

    #[inline]
    pub fn at(&self, loc: Location) -> T {
        self.tiles[grid_index(loc)]
    }

    #[inline]
    pub fn at_mut(&mut self, loc: Location) -> &mut T {
        &mut self.tiles[grid_index(loc)]
    }

    #[inline]
    pub fn set(&mut self, loc: Location, value: T) {
        *self.at_mut(loc) = value;
    }

    pub fn tiles(&self) -> impl Iterator<Item = (Location, T)> + '_ {
        zone_locations().zip(self.tiles.iter().copied())
    }
}

impl<T: Copy> TryFrom<Vec<T>> for ZoneGrid<T> {
    type Error = String;

    fn try_from(tiles: Vec<T>) -> Result<Self, Self::Error> {
        if tiles.len() == ZONE_AREA {
            Ok(ZoneGrid { tiles })
        } else {
            Err(format!("zone grid needs {} tiles, got {}", ZONE_AREA, tiles.len()))
        }
    }
}

impl<T: Copy> From<ZoneGrid<T>> for Vec<T> {
    fn from(grid: ZoneGrid<T>) -> Self {
        grid.tiles
    }
}

/// Neighbor offsets for 8-directional movement.
pub const NEIGHBORS_8: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosed_terrain_has_no_exits() {
        assert!(ZoneTerrain::enclosed().get_exits().is_empty());
    }

    #[test]
    fn plain_terrain_exits_cover_border_once() {
        let exits = ZoneTerrain::plain().get_exits();
        assert_eq!(exits.len(), 4 * 49);
        let unique: std::collections::HashSet<_> = exits.iter().collect();
        assert_eq!(unique.len(), exits.len());
    }

    #[test]
    fn tile_kinds() {
        let mut terrain = ZoneTerrain::plain();
        terrain.set_xy(5, 5, TerrainFlags::WALL);
        terrain.set_xy(6, 5, TerrainFlags::SWAMP);
        assert_eq!(terrain.tile_kind(Location::from_xy(5, 5)), TileKind::Wall);
        assert_eq!(terrain.tile_kind(Location::from_xy(6, 5)), TileKind::Swamp);
        assert_eq!(terrain.tile_kind(Location::from_xy(0, 5)), TileKind::Exit);
        assert_eq!(terrain.tile_kind(Location::from_xy(7, 5)), TileKind::Open);
    }

    #[test]
    fn exits_skip_walled_border_tiles() {
        let mut terrain = ZoneTerrain::enclosed();
        terrain.set_xy(20, 0, TerrainFlags::NONE);
        terrain.set_xy(0, 31, TerrainFlags::SWAMP);
        assert_eq!(
            terrain.get_exits(),
            vec![Location::from_xy(20, 0), Location::from_xy(0, 31)]
        );
    }

    #[test]
    fn grid_addresses_tiles_by_location() {
        let grid = ZoneGrid::from_fn(|loc| loc.x() == loc.y());
        assert!(grid.at(Location::from_xy(7, 7)));
        assert!(!grid.at(Location::from_xy(7, 8)));
        assert_eq!(grid.tiles().filter(|(_, v)| *v).count(), 50);

        let json = serde_json::to_string(&ZoneGrid::new(3u8)).unwrap();
        let back: ZoneGrid<u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at(Location::from_xy(49, 49)), 3);
    }

    #[test]
    fn grid_rejects_wrong_size() {
        let json = "[1,2,3]";
        assert!(serde_json::from_str::<ZoneGrid<u8>>(json).is_err());
    }
}
