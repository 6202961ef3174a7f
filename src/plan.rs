use crate::constants::*;
use crate::location::*;
use crate::structure::StructureType;
use crate::zone::OrderHandle;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Placement state of a plan entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EntryState {
    Planned,
    /// An order was issued (`order` is its handle) or the structure was
    /// found already standing (`order` is `None`).
    Placed { order: Option<OrderHandle> },
}

impl EntryState {
    pub fn is_placed(&self) -> bool {
        matches!(self, EntryState::Placed { .. })
    }

    pub fn order(&self) -> Option<OrderHandle> {
        match self {
            EntryState::Placed { order } => *order,
            EntryState::Planned => None,
        }
    }
}

/// A single building in the region plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedBuilding {
    #[serde(rename = "s")]
    pub structure_type: StructureType,
    #[serde(rename = "l")]
    pub location: Location,
    #[serde(rename = "p")]
    pub priority: u32,
    #[serde(rename = "t")]
    pub min_tier: u8,
    #[serde(flatten)]
    pub state: EntryState,
    #[serde(rename = "r")]
    pub reason: String,
}

impl PlannedBuilding {
    pub fn new(
        structure_type: StructureType,
        location: Location,
        priority: u32,
        min_tier: u8,
        reason: impl Into<String>,
    ) -> Self {
        PlannedBuilding {
            structure_type,
            location,
            priority,
            min_tier,
            state: EntryState::Planned,
            reason: reason.into(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.state.is_placed()
    }
}

/// Why a road tile is worth building, ranked highest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoadPurpose {
    Resource,
    Control,
    Mineral,
    Exit,
    Internal,
}

impl RoadPurpose {
    pub fn base_priority(self) -> u32 {
        match self {
            RoadPurpose::Resource => 90,
            RoadPurpose::Control => 80,
            RoadPurpose::Mineral => 60,
            RoadPurpose::Exit => 40,
            RoadPurpose::Internal => 20,
        }
    }
}

/// A single road tile in the region plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoad {
    #[serde(rename = "l")]
    pub location: Location,
    #[serde(rename = "p")]
    pub priority: u32,
    #[serde(rename = "f")]
    pub traffic_score: f64,
    /// Raw visit count behind `traffic_score`; eligibility is judged on this.
    #[serde(rename = "v", default)]
    pub visits: u32,
    #[serde(rename = "k")]
    pub purpose: RoadPurpose,
    #[serde(flatten)]
    pub state: EntryState,
}

impl PlannedRoad {
    pub fn new(location: Location, priority: u32, traffic_score: f64, purpose: RoadPurpose) -> Self {
        PlannedRoad {
            location,
            priority,
            traffic_score,
            visits: 0,
            purpose,
            state: EntryState::Planned,
        }
    }

    pub fn with_visits(mut self, visits: u32) -> Self {
        self.visits = visits;
        self
    }

    pub fn is_placed(&self) -> bool {
        self.state.is_placed()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanStatus {
    Planning,
    Ready,
    Building,
    Complete,
}

/// Why a plan was rebuilt from scratch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplanReason {
    Initial,
    TierUpgrade,
    InvalidCeiling,
    Stale,
}

/// The persisted plan of one zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionPlan {
    pub buildings: Vec<PlannedBuilding>,
    pub roads: Vec<PlannedRoad>,
    pub tier: u8,
    pub status: PlanStatus,
    pub priority: u32,
    pub created_at: u64,
    pub last_updated: u64,
}

impl RegionPlan {
    pub fn new(tier: u8, tick: u64) -> Self {
        RegionPlan {
            buildings: Vec::new(),
            roads: Vec::new(),
            tier,
            status: PlanStatus::Planning,
            priority: 0,
            created_at: tick,
            last_updated: tick,
        }
    }

    /// Count of planned entries by structure type. Roads count as `Road`.
    pub fn counts(&self) -> FnvHashMap<StructureType, u32> {
        let mut counts: FnvHashMap<StructureType, u32> = FnvHashMap::default();
        for building in &self.buildings {
            *counts.entry(building.structure_type).or_insert(0) += 1;
        }
        if !self.roads.is_empty() {
            *counts.entry(StructureType::Road).or_insert(0) += self.roads.len() as u32;
        }
        counts
    }

    pub fn count(&self, structure_type: StructureType) -> u32 {
        self.counts().get(&structure_type).copied().unwrap_or(0)
    }

    /// First structure type whose planned count is over its ceiling at `tier`.
    pub fn ceiling_violation(&self, tier: u8) -> Option<StructureType> {
        let mut violations: Vec<StructureType> = self
            .counts()
            .into_iter()
            .filter(|(structure_type, count)| *count > structure_limit(*structure_type, tier))
            .map(|(structure_type, _)| structure_type)
            .collect();
        violations.sort();
        violations.into_iter().next()
    }

    pub fn get_locations(&self, structure_type: StructureType) -> Vec<Location> {
        self.buildings
            .iter()
            .filter(|b| b.structure_type == structure_type)
            .map(|b| b.location)
            .collect()
    }

    /// Recompute status and overall priority from entry states.
    ///
    /// A plan holds `Planning` only while it has no buildings: generation
    /// runs to completion inside one pass, so a fresh plan leaves that
    /// state on the refresh that ends the same pass.
    pub fn refresh_status(&mut self, tier: u8, tick: u64) {
        let unlocked = || self.buildings.iter().filter(|b| b.min_tier <= tier);
        let placed = unlocked().filter(|b| b.is_placed()).count();
        let outstanding: Vec<u32> = unlocked()
            .filter(|b| !b.is_placed())
            .map(|b| b.priority)
            .collect();

        self.status = match (placed, outstanding.len()) {
            _ if self.buildings.is_empty() => PlanStatus::Planning,
            (0, _) => PlanStatus::Ready,
            (_, 0) => PlanStatus::Complete,
            _ => PlanStatus::Building,
        };

        self.priority = if outstanding.is_empty() {
            0
        } else {
            outstanding.iter().sum::<u32>() / outstanding.len() as u32
        };

        self.last_updated = tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn building(x: u8, structure_type: StructureType) -> PlannedBuilding {
        PlannedBuilding::new(structure_type, Location::from_xy(x, 10), 50, 1, "test")
    }

    #[test]
    fn status_follows_placement() {
        let mut plan = RegionPlan::new(2, 0);
        plan.buildings.push(building(10, StructureType::Spawn));
        plan.buildings.push(building(11, StructureType::Extension));
        assert_eq!(plan.status, PlanStatus::Planning);

        plan.refresh_status(2, 1);
        assert_eq!(plan.status, PlanStatus::Ready);
        assert_eq!(plan.priority, 50);

        plan.buildings[0].state = EntryState::Placed { order: None };
        plan.refresh_status(2, 2);
        assert_eq!(plan.status, PlanStatus::Building);

        plan.buildings[1].state = EntryState::Placed {
            order: Some(OrderHandle(Uuid::from_u128(1))),
        };
        plan.refresh_status(2, 3);
        assert_eq!(plan.status, PlanStatus::Complete);
        assert_eq!(plan.priority, 0);
        assert_eq!(plan.last_updated, 3);
    }

    #[test]
    fn empty_plan_stays_planning() {
        let mut plan = RegionPlan::new(0, 0);
        plan.refresh_status(0, 5);
        assert_eq!(plan.status, PlanStatus::Planning);
        assert_eq!(plan.priority, 0);
        assert_eq!(plan.last_updated, 5);
    }

    #[test]
    fn detects_ceiling_violation() {
        let mut plan = RegionPlan::new(2, 0);
        for x in 10..15 {
            plan.buildings.push(building(x, StructureType::Extension));
        }
        assert_eq!(plan.ceiling_violation(2), None);
        assert_eq!(plan.ceiling_violation(1), Some(StructureType::Extension));
        plan.buildings.push(building(20, StructureType::Extension));
        assert_eq!(plan.ceiling_violation(2), Some(StructureType::Extension));
    }

    #[test]
    fn entry_state_serializes_as_tagged_variant() {
        let mut b = building(10, StructureType::Tower);
        b.state = EntryState::Placed {
            order: Some(OrderHandle(Uuid::from_u128(7))),
        };
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"state\":\"placed\""));
        let back: PlannedBuilding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
