//! Zone terrain classification, key positions and planning-center search.

use crate::constants::*;
use crate::context::PlanningContext;
use crate::location::*;
use crate::memory::{TerrainCache, ZoneMemory};
use crate::pathing::is_walkable;
use crate::structure::StructureType;
use crate::terrain::*;
use crate::zone::*;
use log::*;
use serde::{Deserialize, Serialize};

/// Every tile of the zone sorted into exactly one class, plus the planning center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainAnalysis {
    pub open: Vec<Location>,
    pub walls: Vec<Location>,
    pub swamps: Vec<Location>,
    pub exits: Vec<Location>,
    pub center: Location,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPositions {
    pub control_point: Option<Location>,
    pub resource_nodes: Vec<Location>,
    pub mineral: Option<Location>,
    pub exits: Vec<Location>,
    pub anchors: Vec<Location>,
}

/// Walkable tiles an anchor needs in its 3x3 block, out of 9.
const ANCHOR_MIN_OPEN: usize = 6;

/// Classify every tile and locate the planning center. The result is cached
/// in `memory` only when no cache exists yet; replacing a stale cache is the
/// caller's job (see [`analysis_for`]).
pub fn analyze(ctx: &PlanningContext, view: &dyn ZoneView, memory: &mut ZoneMemory) -> TerrainAnalysis {
    let start = ctx.elapsed();
    let terrain = view.terrain();

    let mut open = Vec::new();
    let mut walls = Vec::new();
    let mut swamps = Vec::new();
    let mut exits = Vec::new();

    for loc in zone_locations() {
        match terrain.tile_kind(loc) {
            TileKind::Open => open.push(loc),
            TileKind::Wall => walls.push(loc),
            TileKind::Swamp => swamps.push(loc),
            TileKind::Exit => exits.push(loc),
        }
    }

    let analysis = TerrainAnalysis {
        open,
        walls,
        swamps,
        exits,
        center: central_area(ctx, view),
    };

    if memory.terrain.is_none() {
        memory.terrain = Some(TerrainCache {
            analysis: analysis.clone(),
            key_positions: key_positions(view),
            last_analyzed: ctx.tick(),
        });
    }

    debug!(
        "Analyzed {}: {} open, {} walls, {} swamps, {} exits, center {}",
        view.name(),
        analysis.open.len(),
        analysis.walls.len(),
        analysis.swamps.len(),
        analysis.exits.len(),
        analysis.center
    );
    ctx.log_since("terrain analysis", start);

    analysis
}

/// The cached analysis if it is younger than the terrain TTL.
pub fn cached_analysis<'a>(ctx: &PlanningContext, memory: &'a ZoneMemory) -> Option<&'a TerrainAnalysis> {
    memory
        .terrain
        .as_ref()
        .filter(|cache| ctx.tick().saturating_sub(cache.last_analyzed) <= ctx.config().terrain_ttl)
        .map(|cache| &cache.analysis)
}

pub fn clear_cache(memory: &mut ZoneMemory) {
    memory.terrain = None;
}

/// Fresh analysis for the zone, re-analyzing when the cache is missing or stale.
pub fn analysis_for(ctx: &PlanningContext, view: &dyn ZoneView, memory: &mut ZoneMemory) -> TerrainAnalysis {
    if let Some(analysis) = cached_analysis(ctx, memory) {
        return analysis.clone();
    }
    clear_cache(memory);
    analyze(ctx, view, memory)
}

pub fn key_positions(view: &dyn ZoneView) -> KeyPositions {
    KeyPositions {
        control_point: view.control_point(),
        resource_nodes: view.resource_nodes().to_vec(),
        mineral: view.minerals().first().copied(),
        exits: view.terrain().get_exits(),
        anchors: structure_locations(view, StructureType::Spawn),
    }
}

fn is_open_ground(view: &dyn ZoneView, loc: Location) -> bool {
    loc.is_interior() && is_walkable(view, loc) && !is_key_object(view, loc)
}

/// Weighted centroid of the control point (weight 2) and resource nodes
/// (weight 1 each), moved to the nearest open tile by ring search.
pub fn central_area(ctx: &PlanningContext, view: &dyn ZoneView) -> Location {
    let fallback = Location::from_xy(ZONE_CENTER.0, ZONE_CENTER.1);

    let weighted = view
        .control_point()
        .map(|loc| (loc, 2u32))
        .into_iter()
        .chain(view.resource_nodes().iter().map(|loc| (*loc, 1u32)));

    let (mut sum_x, mut sum_y, mut total) = (0u32, 0u32, 0u32);
    for (loc, weight) in weighted {
        sum_x += loc.x() as u32 * weight;
        sum_y += loc.y() as u32 * weight;
        total += weight;
    }

    if total == 0 {
        return fallback;
    }

    let cx = ((sum_x as f32) / (total as f32)).round() as i16;
    let cy = ((sum_y as f32) / (total as f32)).round() as i16;

    let radius = ctx.config().center_search_radius as i16;
    for r in 0..=radius {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs().max(dy.abs()) != r {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if !in_interior(x, y) {
                    continue;
                }
                let loc = Location::from_xy(x as u8, y as u8);
                if is_open_ground(view, loc) {
                    return loc;
                }
            }
        }
    }

    warn!("No open tile near the centroid of {}, using zone center", view.name());
    fallback
}

/// Walkable interior tiles within `radius` (Chebyshev) of `center`.
pub fn buildable_area(view: &dyn ZoneView, center: Location, radius: u8) -> Vec<Location> {
    let r = radius as i16;
    let mut tiles = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let (x, y) = (center.x() as i16 + dx, center.y() as i16 + dy);
            if !in_interior(x, y) {
                continue;
            }
            let loc = Location::from_xy(x as u8, y as u8);
            if is_walkable(view, loc) {
                tiles.push(loc);
            }
        }
    }
    tiles
}

/// Whether a new structure of the given type can go on the tile. Anchors
/// additionally need most of their 3x3 block walkable.
pub fn is_suitable_for_structure(view: &dyn ZoneView, loc: Location, structure_type: StructureType) -> bool {
    if !is_open_ground(view, loc) {
        return false;
    }

    let occupied = view
        .structures_at(loc)
        .iter()
        .any(|s| s.structure_type != StructureType::Rampart);
    if occupied || view.order_at(loc).is_some() {
        return false;
    }

    if structure_type.is_anchor() {
        let open = std::iter::once((0i8, 0i8))
            .chain(NEIGHBORS_8.iter().copied())
            .filter_map(|(dx, dy)| loc.checked_add(dx, dy))
            .filter(|n| is_walkable(view, *n))
            .count();
        return open >= ANCHOR_MIN_OPEN;
    }

    true
}
