pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod layout_planner;
pub mod location;
pub mod memory;
pub mod pathing;
pub mod plan;
pub mod planner;
pub mod road_planner;
pub mod sim;
pub mod structure;
pub mod templates;
pub mod terrain;
pub mod terrain_analyzer;
pub mod traffic;
pub mod zone;

pub use config::{PlannerConfig, ScoringWeights};
pub use context::PlanningContext;
pub use error::{OrderError, PlannerError};
pub use location::{Location, ZoneName, ZonePosition};
pub use plan::{PlanStatus, RegionPlan};
pub use planner::{ZonePlanner, ZoneReport};
pub use structure::StructureType;
pub use zone::{ConstructionHost, ZoneView};
