//! Cost matrices, their per-zone cache, and shortest-path search.

use crate::constants::*;
use crate::context::PlanningContext;
use crate::location::*;
use crate::terrain::*;
use crate::zone::*;
use fnv::{FnvHashMap, FnvHashSet};
use log::*;
use pathfinding::directed::astar::astar;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Distance reported between positions in different zones.
pub const INFINITE_DISTANCE: u32 = u32::MAX;

/// Per-tile traversal cost: 1 plain, 5 swamp, 255 impassable.
pub type CostMatrix = ZoneGrid<u8>;

#[derive(Clone, Serialize, Deserialize)]
pub struct CachedMatrix {
    pub matrix: CostMatrix,
    pub built_at: u64,
}

/// Cost matrices keyed by zone. Entries are only ever replaced whole.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CostMatrixCache {
    entries: FnvHashMap<ZoneName, CachedMatrix>,
}

impl CostMatrixCache {
    /// Return the cached matrix for the zone, rebuilding it if missing or
    /// older than `ttl` ticks.
    pub fn get_or_build(&mut self, view: &dyn ZoneView, tick: u64, ttl: u64) -> &CostMatrix {
        let fresh = self
            .entries
            .get(view.name())
            .map(|entry| tick.saturating_sub(entry.built_at) <= ttl)
            .unwrap_or(false);

        if !fresh {
            debug!("Rebuilding cost matrix for {}", view.name());
            self.entries.insert(
                view.name().clone(),
                CachedMatrix {
                    matrix: build_cost_matrix(view),
                    built_at: tick,
                },
            );
        }

        &self.entries[view.name()].matrix
    }

    /// Drop the entry for one zone, or every entry when `zone` is `None`.
    pub fn clear(&mut self, zone: Option<&ZoneName>) {
        match zone {
            Some(zone) => {
                self.entries.remove(zone);
            }
            None => self.entries.clear(),
        }
    }

    pub fn contains(&self, zone: &ZoneName) -> bool {
        self.entries.contains_key(zone)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a full cost matrix from terrain, structures and open orders.
pub fn build_cost_matrix(view: &dyn ZoneView) -> CostMatrix {
    let terrain = view.terrain();
    let mut matrix = CostMatrix::from_fn(|loc| {
        if terrain.is_wall_at(loc) {
            COST_BLOCKED
        } else if terrain.is_swamp(loc.x(), loc.y()) {
            COST_SWAMP
        } else {
            COST_PLAIN
        }
    });

    for (loc, structure) in view.structures() {
        let cost = if structure.structure_type.blocks_movement(structure.owned) {
            COST_BLOCKED
        } else {
            COST_PLAIN
        };
        overlay(&mut matrix, loc, cost);
    }

    for (loc, order) in view.orders() {
        let cost = if order.structure_type.blocks_movement(true) {
            COST_BLOCKED
        } else {
            COST_PLAIN
        };
        overlay(&mut matrix, loc, cost);
    }

    matrix
}

// Structures replace terrain cost; a blocking object on the tile always wins.
fn overlay(matrix: &mut CostMatrix, loc: Location, cost: u8) {
    let current = matrix.at_mut(loc);
    if *current != COST_BLOCKED {
        *current = cost;
    }
}

/// Cached cost matrix for the zone, honoring the configured TTL.
pub fn cost_matrix<'a>(ctx: &'a mut PlanningContext, view: &dyn ZoneView) -> &'a CostMatrix {
    let tick = ctx.tick();
    let ttl = ctx.config().cost_matrix_ttl;
    ctx.cost_matrices.get_or_build(view, tick, ttl)
}

#[derive(Clone, Debug, Default)]
pub struct PathOptions {
    /// Node expansion budget; `None` uses the configured default.
    pub max_ops: Option<u32>,
    /// Stop once within this Chebyshev range of the target.
    pub range: u8,
    /// Extra tiles treated as impassable, such as planned but unbuilt structures.
    pub avoid: FnvHashSet<Location>,
}

impl PathOptions {
    pub fn with_range(range: u8) -> Self {
        PathOptions {
            range,
            ..Default::default()
        }
    }

    pub fn avoiding(mut self, avoid: FnvHashSet<Location>) -> Self {
        self.avoid = avoid;
        self
    }
}

/// Result of a path search. The path excludes the origin tile. When
/// `incomplete` is set the path ends wherever the search gave up, so its
/// length says nothing about the true distance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    pub path: Vec<Location>,
    pub cost: u32,
    pub ops: u32,
    pub incomplete: bool,
}

/// A* search over the zone's cached cost matrix.
pub fn find_path(
    ctx: &mut PlanningContext,
    view: &dyn ZoneView,
    from: Location,
    to: Location,
    options: &PathOptions,
) -> PathResult {
    let max_ops = options.max_ops.unwrap_or(ctx.config().path_max_ops);
    let start = ctx.elapsed();
    let matrix = cost_matrix(ctx, view);
    let result = search(matrix, from, to, options, max_ops);
    ctx.log_since("find_path", start);
    result
}

fn search(
    matrix: &CostMatrix,
    from: Location,
    to: Location,
    options: &PathOptions,
    max_ops: u32,
) -> PathResult {
    let range = options.range;
    let ops = Cell::new(0u32);

    let found = astar(
        &from,
        |&loc| {
            ops.set(ops.get() + 1);
            NEIGHBORS_8
                .iter()
                .filter_map(|&(dx, dy)| {
                    let next = loc.checked_add(dx, dy)?;
                    let cost = matrix.at(next);
                    if cost == COST_BLOCKED || options.avoid.contains(&next) {
                        None
                    } else {
                        Some((next, cost as u32))
                    }
                })
                .collect::<Vec<_>>()
        },
        |&loc| loc.distance_to(to).saturating_sub(range) as u32,
        |&loc| loc.distance_to(to) <= range || ops.get() >= max_ops,
    );

    match found {
        Some((nodes, cost)) => {
            let reached = nodes
                .last()
                .map(|last| last.distance_to(to) <= range)
                .unwrap_or(false);
            PathResult {
                path: nodes.into_iter().skip(1).collect(),
                cost,
                ops: ops.get(),
                incomplete: !reached,
            }
        }
        None => PathResult {
            path: Vec::new(),
            cost: 0,
            ops: ops.get(),
            incomplete: true,
        },
    }
}

/// True iff the tile is not a wall and nothing blocking is built or ordered on it.
pub fn is_walkable(view: &dyn ZoneView, loc: Location) -> bool {
    !view.terrain().is_wall_at(loc) && !has_blocking_object(view, loc)
}

/// Chebyshev distance within a zone, [`INFINITE_DISTANCE`] across zones.
pub fn distance(a: &ZonePosition, b: &ZonePosition) -> u32 {
    if a.zone != b.zone {
        return INFINITE_DISTANCE;
    }
    a.location().distance_to(b.location()) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimZone;
    use crate::structure::StructureType;

    fn open_zone() -> SimZone {
        SimZone::new("W1N1", ZoneTerrain::plain())
    }

    #[test]
    fn matrix_costs_terrain_and_structures() {
        let mut terrain = ZoneTerrain::plain();
        terrain.set_xy(3, 3, TerrainFlags::WALL);
        terrain.set_xy(4, 3, TerrainFlags::SWAMP);
        let mut zone = SimZone::new("W1N1", terrain)
            .with_tier(3)
            .with_structure(5, 3, StructureType::Road)
            .with_structure(6, 3, StructureType::Extension)
            .with_structure(7, 3, StructureType::Rampart);
        zone.add_structure(Location::from_xy(8, 3), StructureType::Rampart, false);
        zone.place_order(Location::from_xy(9, 3), StructureType::Tower)
            .unwrap();

        let matrix = build_cost_matrix(&zone);
        assert_eq!(matrix.at(Location::from_xy(3, 3)), COST_BLOCKED);
        assert_eq!(matrix.at(Location::from_xy(4, 3)), COST_SWAMP);
        assert_eq!(matrix.at(Location::from_xy(5, 3)), COST_PLAIN);
        assert_eq!(matrix.at(Location::from_xy(6, 3)), COST_BLOCKED);
        assert_eq!(matrix.at(Location::from_xy(7, 3)), COST_PLAIN);
        assert_eq!(matrix.at(Location::from_xy(8, 3)), COST_BLOCKED);
        assert_eq!(matrix.at(Location::from_xy(9, 3)), COST_BLOCKED);
        assert_eq!(matrix.at(Location::from_xy(10, 3)), COST_PLAIN);
    }

    #[test]
    fn cache_serves_stale_shape_until_ttl_or_clear() {
        let mut ctx = PlanningContext::default();
        let mut zone = open_zone();
        let loc = Location::from_xy(10, 10);

        assert_eq!(cost_matrix(&mut ctx, &zone).at(loc), COST_PLAIN);
        zone.add_structure(loc, StructureType::Spawn, true);

        ctx.set_tick(500);
        assert_eq!(cost_matrix(&mut ctx, &zone).at(loc), COST_PLAIN);

        ctx.cost_matrices.clear(Some(zone.name()));
        assert_eq!(cost_matrix(&mut ctx, &zone).at(loc), COST_BLOCKED);

        zone.remove_structure(loc, StructureType::Spawn);
        ctx.set_tick(500 + 1001);
        assert_eq!(cost_matrix(&mut ctx, &zone).at(loc), COST_PLAIN);
    }

    #[test]
    fn clear_all_entries() {
        let mut ctx = PlanningContext::default();
        cost_matrix(&mut ctx, &open_zone());
        cost_matrix(&mut ctx, &SimZone::new("W2N1", ZoneTerrain::plain()));
        assert_eq!(ctx.cost_matrices.len(), 2);
        ctx.cost_matrices.clear(None);
        assert!(ctx.cost_matrices.is_empty());
    }

    #[test]
    fn straight_path_on_open_ground() {
        let mut ctx = PlanningContext::default();
        let zone = open_zone();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(10, 10),
            Location::from_xy(20, 10),
            &PathOptions::default(),
        );
        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 10);
        assert_eq!(result.path.last(), Some(&Location::from_xy(20, 10)));
        assert_eq!(result.cost, 10);
    }

    #[test]
    fn path_with_range_stops_adjacent() {
        let mut ctx = PlanningContext::default();
        let zone = open_zone();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(10, 10),
            Location::from_xy(20, 10),
            &PathOptions::with_range(1),
        );
        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 9);
    }

    #[test]
    fn path_detours_around_wall() {
        let mut terrain = ZoneTerrain::plain();
        for y in 5..=15 {
            terrain.set_xy(15, y, TerrainFlags::WALL);
        }
        let zone = SimZone::new("W1N1", terrain);
        let mut ctx = PlanningContext::default();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(10, 10),
            Location::from_xy(20, 10),
            &PathOptions::default(),
        );
        assert!(!result.incomplete);
        assert!(result.path.len() > 10);
        assert!(result.path.iter().all(|l| l.x() != 15 || l.y() < 5 || l.y() > 15));
    }

    #[test]
    fn tiny_budget_reports_incomplete() {
        let mut ctx = PlanningContext::default();
        let zone = open_zone();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(2, 2),
            Location::from_xy(45, 45),
            &PathOptions {
                max_ops: Some(3),
                ..Default::default()
            },
        );
        assert!(result.incomplete);
        assert!(result.ops <= 3);
    }

    #[test]
    fn path_avoids_extra_tiles() {
        let mut ctx = PlanningContext::default();
        let zone = open_zone();
        let avoid: FnvHashSet<Location> = (5..=15).map(|y| Location::from_xy(15, y)).collect();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(10, 10),
            Location::from_xy(20, 10),
            &PathOptions::default().avoiding(avoid.clone()),
        );
        assert!(!result.incomplete);
        assert!(result.path.iter().all(|l| !avoid.contains(l)));
    }

    #[test]
    fn enclosed_target_is_unreachable() {
        let mut terrain = ZoneTerrain::plain();
        for &(dx, dy) in &NEIGHBORS_8 {
            terrain.set_xy((30 + dx) as u8, (30 + dy) as u8, TerrainFlags::WALL);
        }
        let zone = SimZone::new("W1N1", terrain);
        let mut ctx = PlanningContext::default();
        let result = find_path(
            &mut ctx,
            &zone,
            Location::from_xy(10, 10),
            Location::from_xy(30, 30),
            &PathOptions::default(),
        );
        assert!(result.incomplete);
    }

    #[test]
    fn walkability_respects_exemptions() {
        let mut zone = open_zone()
            .with_tier(2)
            .with_structure(5, 5, StructureType::Road)
            .with_structure(6, 5, StructureType::Container)
            .with_structure(7, 5, StructureType::Rampart)
            .with_structure(8, 5, StructureType::Tower);
        zone.place_order(Location::from_xy(9, 5), StructureType::Extension)
            .unwrap();
        assert!(is_walkable(&zone, Location::from_xy(5, 5)));
        assert!(is_walkable(&zone, Location::from_xy(6, 5)));
        assert!(is_walkable(&zone, Location::from_xy(7, 5)));
        assert!(!is_walkable(&zone, Location::from_xy(8, 5)));
        assert!(!is_walkable(&zone, Location::from_xy(9, 5)));
    }

    #[test]
    fn distance_properties() {
        let zone = ZoneName::new("W1N1");
        let a = ZonePosition::new(3, 7, zone.clone());
        let b = ZonePosition::new(10, 9, zone);
        let c = ZonePosition::new(3, 7, ZoneName::new("W2N1"));
        assert_eq!(distance(&a, &b), 7);
        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert_eq!(distance(&a, &a), 0);
        assert_eq!(distance(&a, &c), INFINITE_DISTANCE);
    }
}
