//! Road network planning: connective routes between key positions fused with
//! observed traffic, and road construction order emission.

use crate::constants::*;
use crate::context::PlanningContext;
use crate::location::*;
use crate::memory::ZoneMemory;
use crate::pathing::*;
use crate::plan::*;
use crate::structure::StructureType;
use crate::templates;
use crate::terrain_analyzer::{self, KeyPositions};
use crate::traffic::{self, TrafficState};
use crate::zone::*;
use fnv::{FnvHashMap, FnvHashSet};
use itertools::Itertools;
use log::*;
use std::cmp::Reverse;

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkStats {
    pub road_count: usize,
    /// Mean hits / hits_max over built roads, 1.0 when there are none.
    pub average_integrity: f64,
    pub high_traffic_roads: usize,
    /// High-traffic tiles that could take a road but have none.
    pub upgrade_recommendations: Vec<Location>,
}

/// Purpose of a route, from the key positions its endpoints touch.
fn route_purpose(key: &KeyPositions, a: Location, b: Location) -> RoadPurpose {
    let ends = [a, b];
    if ends.iter().any(|l| key.resource_nodes.contains(l)) {
        RoadPurpose::Resource
    } else if ends.iter().any(|l| key.control_point == Some(*l)) {
        RoadPurpose::Control
    } else if ends.iter().any(|l| key.mineral == Some(*l)) {
        RoadPurpose::Mineral
    } else if ends.iter().any(|l| key.exits.contains(l)) {
        RoadPurpose::Exit
    } else {
        RoadPurpose::Internal
    }
}

/// Where roads radiate from: the first built anchor, else the planned one,
/// else the planning center.
pub fn hub_location(
    view: &dyn ZoneView,
    buildings: &[PlannedBuilding],
    center: Location,
) -> Location {
    structure_locations(view, StructureType::Spawn)
        .first()
        .copied()
        .or_else(|| {
            buildings
                .iter()
                .find(|b| b.structure_type.is_anchor())
                .map(|b| b.location)
        })
        .unwrap_or(center)
}

/// Nearest exit tile on each side of the zone, closest sides first.
pub fn exit_targets(exits: &[Location], hub: Location, max_routes: usize) -> Vec<Location> {
    let side = |loc: &Location| match (loc.x(), loc.y()) {
        (_, 0) => 0,
        (x, _) if x == ZONE_WIDTH - 1 => 1,
        (_, y) if y == ZONE_HEIGHT - 1 => 2,
        _ => 3,
    };

    exits
        .iter()
        .into_group_map_by(|loc| side(loc))
        .into_values()
        .filter_map(|group| {
            group
                .into_iter()
                .min_by_key(|loc| (loc.distance_to(hub), **loc))
                .copied()
        })
        .sorted_by_key(|loc| (loc.distance_to(hub), *loc))
        .take(max_routes)
        .collect()
}

/// Road candidates for the zone, highest priority first.
///
/// Every route between the hub, resource nodes, control point, mineral and
/// nearest exits is searched around blocking planned buildings and reserved
/// template tiles; incomplete searches are dropped. Each path tile
/// gets its route's base priority plus a tenth of its traffic score, keeping
/// the best entry where routes overlap. High-traffic tiles off every route
/// are added as internal roads at a fifth of their traffic score.
pub fn plan_network(
    ctx: &mut PlanningContext,
    view: &dyn ZoneView,
    memory: &mut ZoneMemory,
    buildings: &[PlannedBuilding],
) -> Vec<PlannedRoad> {
    let start = ctx.elapsed();
    let analysis = terrain_analyzer::analysis_for(ctx, view, memory);
    let key = terrain_analyzer::key_positions(view);
    let hub = hub_location(view, buildings, analysis.center);

    let building_tiles: FnvHashSet<Location> = buildings.iter().map(|b| b.location).collect();
    let mut avoid: FnvHashSet<Location> = templates::reserved_tiles(hub);
    avoid.extend(
        buildings
            .iter()
            .filter(|b| b.structure_type.blocks_movement(true))
            .map(|b| b.location),
    );
    avoid.extend(key.resource_nodes.iter().copied());
    avoid.extend(key.control_point);
    avoid.extend(key.mineral);

    let mut routes: Vec<(Location, Location, u8)> = Vec::new();
    for node in &key.resource_nodes {
        routes.push((hub, *node, 1));
    }
    if let Some(control) = key.control_point {
        routes.push((hub, control, 1));
        for node in &key.resource_nodes {
            routes.push((*node, control, 1));
        }
    }
    if let Some(mineral) = key.mineral {
        routes.push((hub, mineral, 1));
    }
    for exit in exit_targets(&key.exits, hub, ctx.config().max_exit_routes) {
        routes.push((hub, exit, 0));
    }

    let mut options = PathOptions::default().avoiding(avoid);
    let mut candidates: FnvHashMap<Location, PlannedRoad> = FnvHashMap::default();

    for (from, to, range) in routes {
        options.range = range;
        let result = find_path(ctx, view, from, to, &options);
        if result.incomplete {
            debug!("Skipping incomplete route {} -> {} in {}", from, to, view.name());
            continue;
        }

        let purpose = route_purpose(&key, from, to);
        // Routes may cross passable buildings but never put a road on them.
        for tile in result.path.into_iter().filter(|t| !building_tiles.contains(t)) {
            let score = traffic::traffic_score(ctx, &mut memory.traffic, tile);
            let priority = purpose.base_priority() + (score / 10.0).floor() as u32;
            let better = candidates
                .get(&tile)
                .map(|existing| priority > existing.priority)
                .unwrap_or(true);
            if better {
                let visits = traffic::visit_count(ctx, &mut memory.traffic, tile);
                candidates.insert(
                    tile,
                    PlannedRoad::new(tile, priority, score, purpose).with_visits(visits),
                );
            }
        }
    }

    let on_routes = candidates.len();
    for tile in traffic::high_traffic_positions(ctx, &mut memory.traffic) {
        if candidates.contains_key(&tile)
            || building_tiles.contains(&tile)
            || options.avoid.contains(&tile)
            || view.terrain().is_wall_at(tile)
            || has_blocking_object(view, tile)
        {
            continue;
        }
        let score = traffic::traffic_score(ctx, &mut memory.traffic, tile);
        let priority = (score / 5.0).floor() as u32;
        let visits = traffic::visit_count(ctx, &mut memory.traffic, tile);
        candidates.insert(
            tile,
            PlannedRoad::new(tile, priority, score, RoadPurpose::Internal).with_visits(visits),
        );
    }

    info!(
        "Road network for {}: {} route tiles, {} traffic tiles",
        view.name(),
        on_routes,
        candidates.len() - on_routes
    );
    ctx.log_since("plan_network", start);

    candidates
        .into_values()
        .sorted_by_key(|r| (Reverse(r.priority), r.location))
        .collect()
}

/// Replace the plan's roads with fresh candidates, carrying over placement
/// state by tile. Placed roads that are no longer proposed are kept.
pub fn merge_roads(plan: &mut RegionPlan, candidates: Vec<PlannedRoad>) {
    let mut previous: FnvHashMap<Location, PlannedRoad> =
        plan.roads.drain(..).map(|r| (r.location, r)).collect();

    let mut merged: Vec<PlannedRoad> = candidates
        .into_iter()
        .map(|mut road| {
            if let Some(old) = previous.remove(&road.location) {
                road.state = old.state;
            }
            road
        })
        .collect();

    merged.extend(previous.into_values().filter(|r| r.is_placed()));
    merged.sort_by_key(|r| (Reverse(r.priority), r.location));
    plan.roads = merged;
}

fn is_excluded(view: &dyn ZoneView, loc: Location) -> bool {
    view.terrain().is_wall_at(loc)
        || has_structure(view, loc, StructureType::Road)
        || has_blocking_object(view, loc)
        || view.order_at(loc).is_some()
}

/// Order the highest-priority eligible roads within the road share of the
/// order budget. A road is eligible with enough traffic evidence or a
/// priority at the bypass cutoff. Traffic evidence is the raw visit count,
/// the same measure that marks a tile as high traffic. Returns how many
/// orders were placed.
pub fn place_road_orders<H: ConstructionHost>(
    ctx: &mut PlanningContext,
    host: &mut H,
    roads: &mut [PlannedRoad],
) -> usize {
    let open_roads = host
        .orders()
        .iter()
        .filter(|(_, o)| o.structure_type == StructureType::Road)
        .count();
    let budget = ctx.config().road_order_budget().saturating_sub(open_roads);
    if budget == 0 {
        return 0;
    }

    let min_traffic = ctx.config().min_traffic_threshold;
    let bypass = ctx.config().road_priority_bypass;

    let eligible: Vec<usize> = roads
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            !r.is_placed()
                && (r.visits >= min_traffic || r.priority >= bypass)
                && !is_excluded(&*host, r.location)
        })
        .sorted_by_key(|(_, r)| Reverse(r.priority))
        .map(|(i, _)| i)
        .collect();

    let mut placed = 0;
    for i in eligible {
        if placed >= budget {
            break;
        }
        let road = &mut roads[i];
        match host.place_order(road.location, StructureType::Road) {
            Ok(handle) => {
                road.state = EntryState::Placed {
                    order: Some(handle),
                };
                placed += 1;
            }
            Err(err) => {
                warn!("Road order at {} in {} rejected: {}", road.location, host.name(), err);
            }
        }
    }

    if placed > 0 {
        debug!("Ordered {} roads in {}", placed, host.name());
        ctx.cost_matrices.clear(Some(host.name()));
    }

    placed
}

pub fn network_stats(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    traffic_state: &mut TrafficState,
) -> NetworkStats {
    let roads: Vec<StructureInfo> = view
        .structures()
        .into_iter()
        .map(|(_, s)| s)
        .filter(|s| s.structure_type == StructureType::Road)
        .collect();

    let average_integrity = if roads.is_empty() {
        1.0
    } else {
        roads
            .iter()
            .map(|s| s.hits as f64 / s.hits_max.max(1) as f64)
            .sum::<f64>()
            / roads.len() as f64
    };

    let hot = traffic::high_traffic_positions(ctx, traffic_state);
    let (with_road, without_road): (Vec<Location>, Vec<Location>) = hot
        .into_iter()
        .partition(|loc| has_structure(view, *loc, StructureType::Road));

    let upgrade_recommendations = without_road
        .into_iter()
        .filter(|loc| !is_excluded(view, *loc) && !is_key_object(view, *loc))
        .collect();

    NetworkStats {
        road_count: roads.len(),
        average_integrity,
        high_traffic_roads: with_road.len(),
        upgrade_recommendations,
    }
}
