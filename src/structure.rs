use serde::{Deserialize, Serialize};

/// Every structure the planner knows how to lay out.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureType {
    Spawn,
    Extension,
    Road,
    Wall,
    Rampart,
    Link,
    Storage,
    Tower,
    Observer,
    PowerSpawn,
    Extractor,
    Lab,
    Terminal,
    Container,
    Nuker,
    Factory,
}

/// How dynamic placement scores a candidate tile for a structure type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ScoringClass {
    /// Close to the control point and resource nodes.
    Production,
    /// Close to the geometric center of the zone.
    Coverage,
    /// Close to the first known anchor.
    Storage,
    /// Flat centrality fallback.
    General,
}

impl StructureType {
    pub const ALL: [StructureType; 16] = [
        StructureType::Spawn,
        StructureType::Extension,
        StructureType::Road,
        StructureType::Wall,
        StructureType::Rampart,
        StructureType::Link,
        StructureType::Storage,
        StructureType::Tower,
        StructureType::Observer,
        StructureType::PowerSpawn,
        StructureType::Extractor,
        StructureType::Lab,
        StructureType::Terminal,
        StructureType::Container,
        StructureType::Nuker,
        StructureType::Factory,
    ];

    /// Structures units can walk over regardless of owner.
    pub fn is_passable(self) -> bool {
        matches!(self, StructureType::Road | StructureType::Container)
    }

    /// Whether a structure of this type stops movement. Ramparts only block
    /// when they belong to someone else.
    pub fn blocks_movement(self, owned: bool) -> bool {
        match self {
            StructureType::Road | StructureType::Container => false,
            StructureType::Rampart => !owned,
            _ => true,
        }
    }

    /// Anchor structures need open ground around them.
    pub fn is_anchor(self) -> bool {
        matches!(self, StructureType::Spawn)
    }

    /// Types the dynamic generator is allowed to place. Roads come from the
    /// road planner, walls and ramparts are not laid out here, and extractors
    /// go straight onto the mineral.
    pub fn is_dynamic(self) -> bool {
        !matches!(
            self,
            StructureType::Road
                | StructureType::Wall
                | StructureType::Rampart
                | StructureType::Extractor
        )
    }

    pub fn scoring_class(self) -> ScoringClass {
        match self {
            StructureType::Container | StructureType::Link | StructureType::Spawn => {
                ScoringClass::Production
            }
            StructureType::Tower | StructureType::Observer => ScoringClass::Coverage,
            StructureType::Storage | StructureType::Terminal | StructureType::Factory => {
                ScoringClass::Storage
            }
            _ => ScoringClass::General,
        }
    }

    /// Base build priority used for dynamically placed structures.
    pub fn base_priority(self) -> u32 {
        match self {
            StructureType::Spawn => 100,
            StructureType::Extension => 70,
            StructureType::Storage => 85,
            StructureType::Container => 75,
            StructureType::Tower => 90,
            StructureType::Terminal => 60,
            StructureType::Link => 65,
            StructureType::Lab => 50,
            StructureType::Extractor => 45,
            StructureType::Factory => 40,
            StructureType::PowerSpawn => 40,
            StructureType::Observer => 30,
            StructureType::Nuker => 30,
            StructureType::Wall | StructureType::Rampart => 20,
            StructureType::Road => 10,
        }
    }
}
