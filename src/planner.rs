//! Per-tick driver for every owned zone.
//!
//! Each tick the driver records unit movement, compacts traffic on its
//! cadence, refreshes the building and road plans on the planning cadence,
//! and emits construction orders on the construction cadence. Zones run
//! independently; an error aborts only that zone's pass for the tick.

use crate::context::PlanningContext;
use crate::error::PlannerError;
use crate::layout_planner;
use crate::location::ZoneName;
use crate::memory::{PlannerMemory, ZoneMemory};
use crate::road_planner::{self, NetworkStats};
use crate::traffic::{self, TrafficState, TrafficStats};
use crate::zone::*;
use log::*;

/// What happened to one zone during a tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneReport {
    pub tracked_units: usize,
    pub compacted: usize,
    pub planned: bool,
    pub building_orders: usize,
    pub road_orders: usize,
}

#[derive(Default)]
pub struct ZonePlanner {
    memory: PlannerMemory,
}

impl ZonePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(memory: PlannerMemory) -> Self {
        ZonePlanner { memory }
    }

    pub fn load(json: &str) -> Result<Self, PlannerError> {
        Ok(Self::with_memory(PlannerMemory::from_json(json)?))
    }

    pub fn save(&self) -> Result<String, PlannerError> {
        Ok(self.memory.to_json()?)
    }

    pub fn memory(&self) -> &PlannerMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut PlannerMemory {
        &mut self.memory
    }

    /// Run one tick over every owned zone. Owned zones missing from `zones`
    /// report [`PlannerError::ZoneNotVisible`].
    pub fn run_tick<H: ConstructionHost>(
        &mut self,
        ctx: &mut PlanningContext,
        tick: u64,
        owned: &[ZoneName],
        zones: &mut [H],
    ) -> Vec<(ZoneName, Result<ZoneReport, PlannerError>)> {
        ctx.set_tick(tick);

        let mut reports = Vec::with_capacity(owned.len());
        for name in owned {
            let result = match zones.iter_mut().find(|zone| zone.name() == name) {
                Some(zone) => run_zone(ctx, zone, self.memory.zone_mut(name)),
                None => Err(PlannerError::ZoneNotVisible(name.clone())),
            };

            if let Err(err) = &result {
                error!("Planning pass for {} aborted: {}", name, err);
            }
            reports.push((name.clone(), result));
        }
        reports
    }

    /// Road network diagnostics. Zones without memory are reported with no
    /// traffic and are not added to memory.
    pub fn network_stats(&mut self, ctx: &PlanningContext, view: &dyn ZoneView) -> NetworkStats {
        match self.memory.zones.get_mut(view.name()) {
            Some(memory) => road_planner::network_stats(ctx, view, &mut memory.traffic),
            None => road_planner::network_stats(ctx, view, &mut TrafficState::default()),
        }
    }

    pub fn traffic_stats(&self, name: &ZoneName) -> Result<TrafficStats, PlannerError> {
        self.memory
            .zone(name)
            .map(|memory| traffic::stats(&memory.traffic))
            .ok_or_else(|| PlannerError::ZoneNotVisible(name.clone()))
    }
}

fn run_zone<H: ConstructionHost>(
    ctx: &mut PlanningContext,
    host: &mut H,
    memory: &mut ZoneMemory,
) -> Result<ZoneReport, PlannerError> {
    let mut report = ZoneReport::default();
    let tick = ctx.tick();

    for unit in host.units().iter().filter(|u| &u.position.zone == host.name()) {
        traffic::track_movement(ctx, &mut memory.traffic, unit);
        report.tracked_units += 1;
    }
    report.compacted = traffic::optimize(ctx, &mut memory.traffic);

    let plan_interval = ctx.config().plan_interval.max(1);
    let construction_interval = ctx.config().construction_interval.max(1);

    if tick % plan_interval == 0 {
        let buildings = layout_planner::plan_zone(ctx, &*host, memory)?.buildings.clone();
        let roads = road_planner::plan_network(ctx, &*host, memory, &buildings);
        if let Some(plan) = memory.plan.as_mut() {
            road_planner::merge_roads(plan, roads);
            layout_planner::refresh_entries(&*host, plan);
            layout_planner::update_status(ctx, &*host, plan);
        }
        report.planned = true;
    }

    if tick % construction_interval == 0 {
        if let Some(plan) = memory.plan.as_mut() {
            report.building_orders = layout_planner::place_construction_orders(ctx, host, plan);
            report.road_orders = road_planner::place_road_orders(ctx, host, &mut plan.roads);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStatus;
    use crate::sim::SimZone;
    use crate::terrain::ZoneTerrain;

    fn zone(name: &str) -> SimZone {
        SimZone::new(name, ZoneTerrain::plain())
            .with_tier(2)
            .with_control_point(10, 10)
            .with_resource_node(40, 40)
    }

    #[test]
    fn cadences_gate_planning_and_orders() {
        let mut ctx = PlanningContext::default();
        let mut planner = ZonePlanner::new();
        let names = vec![ZoneName::new("W1N1")];
        let mut zones = vec![zone("W1N1")];

        let reports = planner.run_tick(&mut ctx, 0, &names, &mut zones);
        let report = reports[0].1.as_ref().unwrap();
        assert!(report.planned);
        assert_eq!(report.building_orders, 5);
        assert_eq!(report.road_orders, 2);

        let reports = planner.run_tick(&mut ctx, 10, &names, &mut zones);
        let report = reports[0].1.as_ref().unwrap();
        assert!(report.planned);
        assert_eq!(report.building_orders, 0);

        let reports = planner.run_tick(&mut ctx, 11, &names, &mut zones);
        assert!(!reports[0].1.as_ref().unwrap().planned);
    }

    #[test]
    fn missing_zone_does_not_stop_others() {
        let mut ctx = PlanningContext::default();
        let mut planner = ZonePlanner::new();
        let names = vec![ZoneName::new("W9N9"), ZoneName::new("W1N1")];
        let mut zones = vec![zone("W1N1")];

        let reports = planner.run_tick(&mut ctx, 0, &names, &mut zones);
        assert!(matches!(reports[0].1, Err(PlannerError::ZoneNotVisible(_))));
        assert!(reports[1].1.is_ok());
        let plan = planner.memory().zone(&names[1]).unwrap().plan.as_ref().unwrap();
        assert_eq!(plan.status, PlanStatus::Building);
    }

    #[test]
    fn units_feed_traffic() {
        let mut ctx = PlanningContext::default();
        let mut planner = ZonePlanner::new();
        let names = vec![ZoneName::new("W1N1")];
        let mut zones = vec![zone("W1N1")];
        zones[0].add_unit("h1", 30, 30, "harvester");
        zones[0].add_unit("h2", 30, 30, "hauler");

        let reports = planner.run_tick(&mut ctx, 1, &names, &mut zones);
        assert_eq!(reports[0].1.as_ref().unwrap().tracked_units, 2);

        let stats = planner.traffic_stats(&names[0]).unwrap();
        assert_eq!(stats.positions, 1);
        assert_eq!(stats.average_traffic, 2.0);
        assert!(planner.traffic_stats(&ZoneName::new("W9N9")).is_err());
    }

    #[test]
    fn stats_for_unknown_zone_leave_memory_alone() {
        let ctx = PlanningContext::default();
        let mut planner = ZonePlanner::new();
        let zone = zone("W1N1");

        let stats = planner.network_stats(&ctx, &zone);
        assert_eq!(stats.road_count, 0);
        assert!(stats.upgrade_recommendations.is_empty());
        assert!(planner.memory().zones.is_empty());
    }

    #[test]
    fn memory_survives_save_and_load() {
        let mut ctx = PlanningContext::default();
        let mut planner = ZonePlanner::new();
        let names = vec![ZoneName::new("W1N1")];
        let mut zones = vec![zone("W1N1")];
        planner.run_tick(&mut ctx, 0, &names, &mut zones);

        let json = planner.save().unwrap();
        let restored = ZonePlanner::load(&json).unwrap();
        assert_eq!(
            restored.memory().zone(&names[0]).unwrap().plan,
            planner.memory().zone(&names[0]).unwrap().plan
        );
        assert!(matches!(ZonePlanner::load("not json"), Err(PlannerError::Memory(_))));
    }
}
