//! Building layout for a zone: which structures go where, and when to order them.
//!
//! A plan is built from two sources. Templates give a fixed core around the
//! anchor; the dynamic generator tops every structure type up to its tier
//! ceiling by scoring nearby tiles. Plans are kept until the tier rises, a
//! ceiling is exceeded, or they go stale, and are otherwise only refreshed.

use crate::config::ScoringWeights;
use crate::constants::*;
use crate::context::PlanningContext;
use crate::error::PlannerError;
use crate::location::*;
use crate::memory::ZoneMemory;
use crate::plan::*;
use crate::structure::*;
use crate::templates::*;
use crate::terrain_analyzer::{self, KeyPositions, TerrainAnalysis};
use crate::zone::*;
use fnv::{FnvHashMap, FnvHashSet};
use itertools::Itertools;
use log::*;
use std::cmp::Reverse;

/// A tile offered to the dynamic generator and its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub location: Location,
    pub score: f32,
}

/// Reference points dynamic scoring measures distance from.
#[derive(Clone, Debug)]
pub struct ScoringTargets {
    /// Resource nodes, then the control point.
    pub production: Vec<Location>,
    pub zone_center: Location,
    pub anchor: Location,
    pub center: Location,
}

impl ScoringTargets {
    fn new(key: &KeyPositions, analysis: &TerrainAnalysis, anchor: Location) -> Self {
        let mut production = key.resource_nodes.clone();
        production.extend(key.control_point);
        if production.is_empty() {
            production.push(analysis.center);
        }

        ScoringTargets {
            production,
            zone_center: Location::from_xy(ZONE_CENTER.0, ZONE_CENTER.1),
            anchor,
            center: analysis.center,
        }
    }
}

/// Why the zone needs a fresh plan, if it does.
pub fn replan_reason(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    plan: Option<&RegionPlan>,
) -> Option<ReplanReason> {
    let plan = match plan {
        Some(plan) => plan,
        None => return Some(ReplanReason::Initial),
    };

    let tier = view.tier();
    if plan.tier < tier {
        return Some(ReplanReason::TierUpgrade);
    }

    if let Some(structure_type) = plan.ceiling_violation(tier) {
        warn!(
            "Plan for {} exceeds the tier {} ceiling for {:?}",
            view.name(),
            tier,
            structure_type
        );
        return Some(ReplanReason::InvalidCeiling);
    }

    if ctx.tick().saturating_sub(plan.created_at) > ctx.config().plan_ttl {
        return Some(ReplanReason::Stale);
    }

    None
}

/// Bring the zone's plan up to date and return it. Replans when needed,
/// otherwise sweeps entry states and recomputes status.
pub fn plan_zone<'a>(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    memory: &'a mut ZoneMemory,
) -> Result<&'a RegionPlan, PlannerError> {
    let mut plan = match memory.plan.take() {
        Some(existing) => match replan_reason(ctx, view, Some(&existing)) {
            None => existing,
            Some(reason) => match create_plan(ctx, view, memory, reason) {
                Ok(fresh) => fresh,
                Err(err) => {
                    memory.plan = Some(existing);
                    return Err(err);
                }
            },
        },
        None => create_plan(ctx, view, memory, ReplanReason::Initial)?,
    };

    refresh_entries(view, &mut plan);
    update_status(ctx, view, &mut plan);

    Ok(&*memory.plan.insert(plan))
}

/// Build a new plan from templates and dynamic placement.
pub fn create_plan(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    memory: &mut ZoneMemory,
    reason: ReplanReason,
) -> Result<RegionPlan, PlannerError> {
    let start = ctx.elapsed();
    let analysis = terrain_analyzer::analysis_for(ctx, view, memory);
    let key = terrain_analyzer::key_positions(view);
    let anchor = choose_anchor(ctx, view, &analysis, &key)
        .ok_or_else(|| PlannerError::NoAnchor(view.name().clone()))?;
    let tier = view.tier();

    let mut buildings = template_buildings(view, tier, anchor);

    let mut taken: FnvHashSet<Location> = reserved_tiles(anchor);
    taken.extend(buildings.iter().map(|b| b.location));

    let targets = ScoringTargets::new(&key, &analysis, anchor);
    let dynamic = dynamic_buildings(ctx, view, tier, &targets, &buildings, &mut taken);
    buildings.extend(dynamic);

    if let Some(extractor) = extractor_building(view, tier) {
        buildings.push(extractor);
    }

    let mut plan = RegionPlan::new(tier, ctx.tick());
    plan.buildings = optimize_building_plan(buildings, tier);

    info!(
        "Created plan for {} ({:?}): tier {}, anchor {}, {} buildings",
        view.name(),
        reason,
        tier,
        anchor,
        plan.buildings.len()
    );
    ctx.log_since("create_plan", start);

    Ok(plan)
}

/// The first existing anchor, else the analysis center if an anchor fits
/// there, else the nearest tile around it that does.
fn choose_anchor(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    analysis: &TerrainAnalysis,
    key: &KeyPositions,
) -> Option<Location> {
    if let Some(existing) = key.anchors.first() {
        return Some(*existing);
    }

    let center = analysis.center;
    terrain_analyzer::buildable_area(view, center, ctx.config().center_search_radius)
        .into_iter()
        .sorted_by_key(|loc| loc.distance_to(center))
        .find(|loc| terrain_analyzer::is_suitable_for_structure(view, *loc, StructureType::Spawn))
}

fn occupied_by_other(view: &dyn ZoneView, loc: Location, structure_type: StructureType) -> bool {
    view.structures_at(loc).iter().any(|s| {
        s.structure_type != structure_type && s.structure_type != StructureType::Rampart
    })
}

fn template_buildings(view: &dyn ZoneView, tier: u8, anchor: Location) -> Vec<PlannedBuilding> {
    templates_up_to_tier(tier)
        .iter()
        .filter(|template| validate_template(template))
        .flat_map(|template| apply_template(template, anchor))
        .filter(|b| {
            !view.terrain().is_wall_at(b.location)
                && !is_key_object(view, b.location)
                && !occupied_by_other(view, b.location, b.structure_type)
        })
        .collect()
}

pub fn score_candidate(
    weights: &ScoringWeights,
    class: ScoringClass,
    loc: Location,
    targets: &ScoringTargets,
) -> f32 {
    let (penalty, distance) = match class {
        ScoringClass::Production => (
            weights.production_penalty,
            targets
                .production
                .iter()
                .map(|target| loc.distance_to(*target))
                .min()
                .unwrap_or(0),
        ),
        ScoringClass::Coverage => (weights.coverage_penalty, loc.distance_to(targets.zone_center)),
        ScoringClass::Storage => (weights.storage_penalty, loc.distance_to(targets.anchor)),
        ScoringClass::General => (weights.general_penalty, loc.distance_to(targets.center)),
    };

    weights.base - penalty * distance as f32
}

// Tiles with the anchor's (x + y) parity, so the template's walkways stay open.
fn on_lattice(anchor: Location, loc: Location) -> bool {
    (anchor.x() as i16 + anchor.y() as i16 - loc.x() as i16 - loc.y() as i16) % 2 == 0
}

/// Suitable, unclaimed tiles for the structure type, scored. Tiles come in
/// scan order so equal scores keep a stable ranking. Only production
/// structures may leave the anchor's lattice.
pub fn candidates_for(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    structure_type: StructureType,
    targets: &ScoringTargets,
    taken: &FnvHashSet<Location>,
) -> Vec<Candidate> {
    let weights = &ctx.config().scoring;
    let class = structure_type.scoring_class();

    let area: Vec<Location> = match class {
        ScoringClass::Production => targets
            .production
            .iter()
            .flat_map(|target| {
                terrain_analyzer::buildable_area(view, *target, weights.production_radius)
            })
            .unique()
            .collect(),
        _ => terrain_analyzer::buildable_area(view, targets.center, weights.search_radius),
    };

    area.into_iter()
        .filter(|loc| !taken.contains(loc))
        .filter(|loc| class == ScoringClass::Production || on_lattice(targets.anchor, *loc))
        .filter(|loc| terrain_analyzer::is_suitable_for_structure(view, *loc, structure_type))
        .map(|location| Candidate {
            location,
            score: score_candidate(weights, class, location, targets),
        })
        .collect()
}

/// The `count` highest-scored candidates. Ties keep their input order.
pub fn select_top_candidates(mut candidates: Vec<Candidate>, count: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(count);
    candidates
}

/// Production candidates shared out across their nearest targets: each
/// round takes the best remaining tile of every target in order, so one
/// resource node cannot claim every slot.
pub fn spread_across_targets(
    candidates: Vec<Candidate>,
    targets: &[Location],
    count: usize,
) -> Vec<Candidate> {
    let nearest = |loc: Location| {
        targets
            .iter()
            .enumerate()
            .min_by_key(|(i, target)| (loc.distance_to(**target), *i))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };

    let mut queues: Vec<std::vec::IntoIter<Candidate>> = candidates
        .into_iter()
        .into_group_map_by(|c| nearest(c.location))
        .into_iter()
        .sorted_by_key(|(target, _)| *target)
        .map(|(_, group)| select_top_candidates(group, count).into_iter())
        .collect();

    let mut chosen = Vec::with_capacity(count);
    while chosen.len() < count {
        let before = chosen.len();
        for queue in queues.iter_mut() {
            if chosen.len() >= count {
                break;
            }
            if let Some(candidate) = queue.next() {
                chosen.push(candidate);
            }
        }
        if chosen.len() == before {
            break;
        }
    }
    chosen
}

fn dynamic_buildings(
    ctx: &PlanningContext,
    view: &dyn ZoneView,
    tier: u8,
    targets: &ScoringTargets,
    planned: &[PlannedBuilding],
    taken: &mut FnvHashSet<Location>,
) -> Vec<PlannedBuilding> {
    let mut buildings = Vec::new();

    for structure_type in StructureType::ALL.iter().copied().filter(|t| t.is_dynamic()) {
        let limit = structure_limit(structure_type, tier);
        let mut count = planned
            .iter()
            .filter(|b| b.structure_type == structure_type)
            .count() as u32;
        if count >= limit {
            continue;
        }

        // Standing structures outside the templates keep their tiles.
        let existing: Vec<Location> = structure_locations(view, structure_type)
            .into_iter()
            .filter(|loc| !taken.contains(loc))
            .collect();
        for loc in existing {
            if count >= limit {
                break;
            }
            count += 1;
            taken.insert(loc);
            buildings.push(PlannedBuilding::new(
                structure_type,
                loc,
                structure_type.base_priority(),
                min_tier_for_nth(structure_type, count),
                "existing",
            ));
        }

        let wanted = limit.saturating_sub(count) as usize;
        if wanted == 0 {
            continue;
        }

        let candidates = candidates_for(ctx, view, structure_type, targets, taken);
        let offered = candidates.len();
        let chosen = match structure_type.scoring_class() {
            ScoringClass::Production => {
                spread_across_targets(candidates, &targets.production, wanted)
            }
            _ => select_top_candidates(candidates, wanted),
        };
        debug!(
            "Dynamic {:?}: {} of {} candidates for {} open slots",
            structure_type,
            chosen.len(),
            offered,
            wanted
        );

        for candidate in chosen {
            count += 1;
            taken.insert(candidate.location);
            buildings.push(PlannedBuilding::new(
                structure_type,
                candidate.location,
                structure_type.base_priority(),
                min_tier_for_nth(structure_type, count),
                format!("dynamic score {:.1}", candidate.score),
            ));
        }
    }

    buildings
}

fn extractor_building(view: &dyn ZoneView, tier: u8) -> Option<PlannedBuilding> {
    if structure_limit(StructureType::Extractor, tier) == 0 {
        return None;
    }
    view.minerals().first().map(|mineral| {
        PlannedBuilding::new(
            StructureType::Extractor,
            *mineral,
            StructureType::Extractor.base_priority(),
            min_tier_for_nth(StructureType::Extractor, 1),
            "mineral",
        )
    })
}

/// Collapse duplicate (type, tile) entries keeping the higher priority,
/// sort by priority (descending, stable), and drop anything over the tier
/// ceiling.
pub fn optimize_building_plan(buildings: Vec<PlannedBuilding>, tier: u8) -> Vec<PlannedBuilding> {
    let mut unique: Vec<PlannedBuilding> = Vec::with_capacity(buildings.len());
    let mut index: FnvHashMap<(StructureType, Location), usize> = FnvHashMap::default();

    for building in buildings {
        let key = (building.structure_type, building.location);
        match index.get(&key) {
            Some(&i) => {
                if building.priority > unique[i].priority {
                    unique[i] = building;
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(building);
            }
        }
    }

    unique.sort_by_key(|b| Reverse(b.priority));

    let mut counts: FnvHashMap<StructureType, u32> = FnvHashMap::default();
    unique.retain(|b| {
        let count = counts.entry(b.structure_type).or_insert(0);
        if *count < structure_limit(b.structure_type, tier) {
            *count += 1;
            true
        } else {
            warn!("Dropping {:?} at {}: over tier {} ceiling", b.structure_type, b.location, tier);
            false
        }
    });

    unique
}

/// What stands on an entry's tile right now.
fn observed_state(view: &dyn ZoneView, loc: Location, structure_type: StructureType) -> Option<EntryState> {
    if has_structure(view, loc, structure_type) {
        return Some(EntryState::Placed { order: None });
    }
    view.order_at(loc)
        .filter(|order| order.structure_type == structure_type)
        .map(|order| EntryState::Placed {
            order: Some(order.handle),
        })
}

/// Sync entry states with the zone. Placed entries whose structure and order
/// are both gone flip back to planned; planned entries whose structure or
/// order already exists flip to placed. Returns how many entries changed.
pub fn refresh_entries(view: &dyn ZoneView, plan: &mut RegionPlan) -> usize {
    let mut changed = 0;

    let entries = plan
        .buildings
        .iter_mut()
        .map(|b| (b.location, b.structure_type, &mut b.state))
        .chain(
            plan.roads
                .iter_mut()
                .map(|r| (r.location, StructureType::Road, &mut r.state)),
        );

    for (loc, structure_type, state) in entries {
        match (state.is_placed(), observed_state(view, loc, structure_type)) {
            (true, None) => {
                debug!("{:?} at {} in {} decayed, replanning it", structure_type, loc, view.name());
                *state = EntryState::Planned;
                changed += 1;
            }
            (false, Some(observed)) => {
                *state = observed;
                changed += 1;
            }
            _ => {}
        }
    }

    changed
}

pub fn update_status(ctx: &PlanningContext, view: &dyn ZoneView, plan: &mut RegionPlan) {
    plan.refresh_status(view.tier(), ctx.tick());
}

/// Issue construction orders for the highest-priority unplaced buildings the
/// zone can take right now. Rejected entries stay unplaced until the next
/// cycle. Returns how many orders were placed.
pub fn place_construction_orders<H: ConstructionHost>(
    ctx: &mut PlanningContext,
    host: &mut H,
    plan: &mut RegionPlan,
) -> usize {
    let tier = host.tier();
    let open = host.orders().len();
    let budget = ctx.config().max_open_orders.saturating_sub(open);
    if budget == 0 {
        debug!("{} has {} open orders, skipping buildings", host.name(), open);
        return 0;
    }

    let eligible: Vec<usize> = plan
        .buildings
        .iter()
        .enumerate()
        .filter(|(_, b)| {
            !b.is_placed()
                && b.min_tier <= tier
                && host.order_at(b.location).is_none()
                && !has_blocking_object(&*host, b.location)
        })
        .sorted_by_key(|(_, b)| Reverse(b.priority))
        .map(|(i, _)| i)
        .collect();

    let mut placed = 0;
    for i in eligible {
        if placed >= budget {
            break;
        }
        let building = &mut plan.buildings[i];
        match host.place_order(building.location, building.structure_type) {
            Ok(handle) => {
                building.state = EntryState::Placed {
                    order: Some(handle),
                };
                placed += 1;
                debug!(
                    "Ordered {:?} at {} in {}",
                    building.structure_type,
                    building.location,
                    host.name()
                );
            }
            Err(err) => {
                warn!(
                    "Order for {:?} at {} in {} rejected: {}",
                    building.structure_type,
                    building.location,
                    host.name(),
                    err
                );
            }
        }
    }

    if placed > 0 {
        ctx.cost_matrices.clear(Some(host.name()));
    }
    plan.refresh_status(tier, ctx.tick());

    placed
}
