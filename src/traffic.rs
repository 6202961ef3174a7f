//! Per-tile unit movement counts with time-decayed scoring.

use crate::context::PlanningContext;
use crate::location::*;
use crate::zone::UnitObservation;
use fnv::FnvHashMap;
use itertools::Itertools;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub count: u32,
    pub last_seen: u64,
    /// Distinct role tags seen on the tile, in first-seen order.
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficState {
    pub records: FnvHashMap<Location, TrafficRecord>,
    pub last_optimized: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrafficStats {
    pub positions: usize,
    pub average_traffic: f64,
    /// Most common role tags with the number of tiles they were seen on.
    pub top_roles: Vec<(String, usize)>,
}

/// Record one observation of a unit on its current tile.
pub fn track_movement(ctx: &PlanningContext, state: &mut TrafficState, unit: &UnitObservation) {
    if !ctx.config().traffic_enabled {
        return;
    }

    let tick = ctx.tick();
    let record = state
        .records
        .entry(unit.position.location())
        .or_insert_with(|| TrafficRecord {
            count: 0,
            last_seen: tick,
            roles: Vec::new(),
        });

    record.count += 1;
    record.last_seen = tick;
    if !record.roles.iter().any(|r| r == &unit.role) {
        record.roles.push(unit.role.clone());
    }
}

/// Drop records not seen within the traffic TTL and return what remains.
pub fn analyze_patterns<'a>(
    ctx: &PlanningContext,
    state: &'a mut TrafficState,
) -> &'a FnvHashMap<Location, TrafficRecord> {
    let tick = ctx.tick();
    let ttl = ctx.config().traffic_ttl;
    let before = state.records.len();

    state
        .records
        .retain(|_, record| tick.saturating_sub(record.last_seen) <= ttl);

    let pruned = before - state.records.len();
    if pruned > 0 {
        debug!("Pruned {} stale traffic records", pruned);
    }

    &state.records
}

/// Visit count scaled linearly down to zero over `ttl` ticks of age.
pub fn decayed_score(count: u32, age: u64, ttl: u64) -> f64 {
    if ttl == 0 {
        return 0.0;
    }
    let freshness = (1.0 - age as f64 / ttl as f64).max(0.0);
    count as f64 * freshness
}

pub fn traffic_score(ctx: &PlanningContext, state: &mut TrafficState, loc: Location) -> f64 {
    let tick = ctx.tick();
    let ttl = ctx.config().traffic_ttl;
    analyze_patterns(ctx, state)
        .get(&loc)
        .map(|record| decayed_score(record.count, tick.saturating_sub(record.last_seen), ttl))
        .unwrap_or(0.0)
}

/// Raw visits recorded on a live tile, 0 if unseen or expired.
pub fn visit_count(ctx: &PlanningContext, state: &mut TrafficState, loc: Location) -> u32 {
    analyze_patterns(ctx, state)
        .get(&loc)
        .map(|record| record.count)
        .unwrap_or(0)
}

/// Tiles whose raw visit count reaches the configured threshold, sorted.
pub fn high_traffic_positions(ctx: &PlanningContext, state: &mut TrafficState) -> Vec<Location> {
    let threshold = ctx.config().min_traffic_threshold;
    analyze_patterns(ctx, state)
        .iter()
        .filter(|(_, record)| record.count >= threshold)
        .map(|(loc, _)| *loc)
        .sorted()
        .collect()
}

/// Drop low-count records once per optimize interval. Returns how many were removed.
pub fn optimize(ctx: &PlanningContext, state: &mut TrafficState) -> usize {
    let tick = ctx.tick();
    let config = ctx.config();
    if tick.saturating_sub(state.last_optimized) < config.traffic_optimize_interval {
        return 0;
    }
    state.last_optimized = tick;

    let cutoff = config.min_traffic_threshold as f64 * config.traffic_compaction_ratio;
    let before = state.records.len();
    state.records.retain(|_, record| record.count as f64 >= cutoff);

    let removed = before - state.records.len();
    if removed > 0 {
        info!("Compacted traffic data: removed {} of {} records", removed, before);
    }
    removed
}

pub fn stats(state: &TrafficState) -> TrafficStats {
    let positions = state.records.len();
    let total: u64 = state.records.values().map(|r| r.count as u64).sum();
    let average_traffic = if positions == 0 {
        0.0
    } else {
        total as f64 / positions as f64
    };

    let mut role_counts: FnvHashMap<&str, usize> = FnvHashMap::default();
    for role in state.records.values().flat_map(|r| r.roles.iter()) {
        *role_counts.entry(role.as_str()).or_insert(0) += 1;
    }

    let top_roles = role_counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(3)
        .map(|(role, count)| (role.to_string(), count))
        .collect();

    TrafficStats {
        positions,
        average_traffic,
        top_roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;

    fn unit(x: u8, y: u8, role: &str) -> UnitObservation {
        UnitObservation {
            name: format!("{}-{}-{}", role, x, y),
            position: ZonePosition::new(x, y, ZoneName::new("W1N1")),
            role: role.to_string(),
        }
    }

    fn record(count: u32, last_seen: u64) -> TrafficRecord {
        TrafficRecord {
            count,
            last_seen,
            roles: Vec::new(),
        }
    }

    #[test]
    fn half_aged_record_scores_half() {
        assert_eq!(decayed_score(10, 250, 500), 5.0);
        assert_eq!(decayed_score(10, 0, 500), 10.0);
        assert_eq!(decayed_score(10, 600, 500), 0.0);
    }

    #[test]
    fn tracking_counts_visits_and_roles() {
        let mut ctx = PlanningContext::default();
        let mut state = TrafficState::default();
        track_movement(&ctx, &mut state, &unit(10, 10, "harvester"));
        ctx.set_tick(3);
        track_movement(&ctx, &mut state, &unit(10, 10, "hauler"));
        track_movement(&ctx, &mut state, &unit(10, 10, "harvester"));

        let record = &state.records[&Location::from_xy(10, 10)];
        assert_eq!(record.count, 3);
        assert_eq!(record.last_seen, 3);
        assert_eq!(record.roles, vec!["harvester".to_string(), "hauler".to_string()]);
    }

    #[test]
    fn tracking_disabled_records_nothing() {
        let config = PlannerConfig {
            traffic_enabled: false,
            ..PlannerConfig::default()
        };
        let ctx = PlanningContext::new(config);
        let mut state = TrafficState::default();
        track_movement(&ctx, &mut state, &unit(10, 10, "harvester"));
        assert!(state.records.is_empty());
    }

    #[test]
    fn scoring_prunes_stale_records() {
        let mut ctx = PlanningContext::default();
        let mut state = TrafficState::default();
        state.records.insert(Location::from_xy(5, 5), record(10, 0));
        state.records.insert(Location::from_xy(6, 6), record(10, 500));

        ctx.set_tick(750);
        assert_eq!(traffic_score(&ctx, &mut state, Location::from_xy(6, 6)), 5.0);
        assert_eq!(traffic_score(&ctx, &mut state, Location::from_xy(5, 5)), 0.0);
        assert!(!state.records.contains_key(&Location::from_xy(5, 5)));
    }

    #[test]
    fn high_traffic_uses_raw_counts() {
        let mut ctx = PlanningContext::default();
        let mut state = TrafficState::default();
        state.records.insert(Location::from_xy(7, 7), record(5, 0));
        state.records.insert(Location::from_xy(8, 8), record(4, 0));
        state.records.insert(Location::from_xy(9, 9), record(50, 0));
        ctx.set_tick(400);
        assert_eq!(
            high_traffic_positions(&ctx, &mut state),
            vec![Location::from_xy(7, 7), Location::from_xy(9, 9)]
        );
    }

    #[test]
    fn optimize_runs_on_interval() {
        let mut ctx = PlanningContext::default();
        let mut state = TrafficState::default();
        state.records.insert(Location::from_xy(7, 7), record(1, 0));
        state.records.insert(Location::from_xy(8, 8), record(2, 0));

        ctx.set_tick(50);
        assert_eq!(optimize(&ctx, &mut state), 0);
        assert_eq!(state.records.len(), 2);

        ctx.set_tick(100);
        assert_eq!(optimize(&ctx, &mut state), 1);
        assert_eq!(state.last_optimized, 100);
        assert!(state.records.contains_key(&Location::from_xy(8, 8)));
    }

    #[test]
    fn stats_report_top_roles() {
        let ctx = PlanningContext::default();
        let mut state = TrafficState::default();
        for (x, role) in [(1, "a"), (2, "a"), (3, "a"), (1, "b"), (2, "b"), (1, "c"), (1, "d"), (2, "d"), (3, "d"), (4, "d")] {
            track_movement(&ctx, &mut state, &unit(x, 10, role));
        }
        let stats = stats(&state);
        assert_eq!(stats.positions, 4);
        assert_eq!(stats.average_traffic, 2.5);
        assert_eq!(
            stats.top_roles,
            vec![("d".to_string(), 4), ("a".to_string(), 3), ("b".to_string(), 2)]
        );
    }
}
