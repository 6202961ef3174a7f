//! Planner state that must survive between ticks.
//!
//! Everything here round-trips through JSON so the host can persist it in
//! whatever store it has.

use crate::location::ZoneName;
use crate::plan::RegionPlan;
use crate::terrain_analyzer::{KeyPositions, TerrainAnalysis};
use crate::traffic::TrafficState;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainCache {
    pub analysis: TerrainAnalysis,
    pub key_positions: KeyPositions,
    pub last_analyzed: u64,
}

/// Persisted state of one zone.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneMemory {
    pub terrain: Option<TerrainCache>,
    pub plan: Option<RegionPlan>,
    pub traffic: TrafficState,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerMemory {
    pub zones: FnvHashMap<ZoneName, ZoneMemory>,
}

impl PlannerMemory {
    pub fn zone(&self, name: &ZoneName) -> Option<&ZoneMemory> {
        self.zones.get(name)
    }

    pub fn zone_mut(&mut self, name: &ZoneName) -> &mut ZoneMemory {
        self.zones.entry(name.clone()).or_default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::plan::*;
    use crate::structure::StructureType;
    use crate::traffic::TrafficRecord;

    #[test]
    fn memory_round_trips_through_json() {
        let name = ZoneName::new("W1N1");
        let mut memory = PlannerMemory::default();
        {
            let zone = memory.zone_mut(&name);
            let mut plan = RegionPlan::new(2, 10);
            plan.buildings.push(PlannedBuilding::new(
                StructureType::Spawn,
                Location::from_xy(25, 25),
                100,
                1,
                "anchor",
            ));
            plan.roads.push(PlannedRoad::new(
                Location::from_xy(26, 25),
                92,
                12.5,
                RoadPurpose::Resource,
            ));
            zone.plan = Some(plan);
            zone.traffic.records.insert(
                Location::from_xy(10, 10),
                TrafficRecord {
                    count: 3,
                    last_seen: 9,
                    roles: vec!["harvester".to_string()],
                },
            );
            zone.traffic.last_optimized = 7;
        }

        let json = memory.to_json().unwrap();
        let back = PlannerMemory::from_json(&json).unwrap();
        let zone = back.zone(&name).unwrap();
        assert_eq!(zone.plan, memory.zone(&name).unwrap().plan);
        assert_eq!(zone.traffic.records[&Location::from_xy(10, 10)].count, 3);
        assert_eq!(zone.traffic.last_optimized, 7);
        assert!(zone.terrain.is_none());
    }

    #[test]
    fn empty_json_object_is_empty_memory() {
        let memory = PlannerMemory::from_json("{}").unwrap();
        assert!(memory.zones.is_empty());
    }
}
