//! The seam between the planner and whatever runs the simulation.
//!
//! `ZoneView` answers read-only questions about a zone, `ConstructionHost`
//! accepts construction commands. The planner never touches host state
//! through any other path.

use crate::error::OrderError;
use crate::location::*;
use crate::structure::StructureType;
use crate::terrain::ZoneTerrain;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host-issued handle of an open construction order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHandle(pub Uuid);

/// A lightweight description of a built structure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StructureInfo {
    pub structure_type: StructureType,
    pub owned: bool,
    pub hits: u32,
    pub hits_max: u32,
}

/// An open construction order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OrderInfo {
    pub handle: OrderHandle,
    pub structure_type: StructureType,
}

/// An owned unit seen this tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitObservation {
    pub name: String,
    pub position: ZonePosition,
    pub role: String,
}

pub trait ZoneView {
    fn name(&self) -> &ZoneName;

    /// Current growth tier of the zone.
    fn tier(&self) -> u8;

    fn terrain(&self) -> &ZoneTerrain;

    fn control_point(&self) -> Option<Location>;

    fn resource_nodes(&self) -> &[Location];

    fn minerals(&self) -> &[Location];

    fn structures_at(&self, loc: Location) -> &[StructureInfo];

    fn structures(&self) -> Vec<(Location, StructureInfo)>;

    fn order_at(&self, loc: Location) -> Option<OrderInfo>;

    fn orders(&self) -> Vec<(Location, OrderInfo)>;

    fn units(&self) -> &[UnitObservation];
}

pub trait ConstructionHost: ZoneView {
    fn place_order(
        &mut self,
        loc: Location,
        structure_type: StructureType,
    ) -> Result<OrderHandle, OrderError>;

    fn cancel_order(&mut self, handle: OrderHandle) -> Result<(), OrderError>;
}

/// Locations of every built structure of the given type.
pub fn structure_locations(view: &dyn ZoneView, structure_type: StructureType) -> Vec<Location> {
    let mut locations: Vec<Location> = view
        .structures()
        .into_iter()
        .filter(|(_, s)| s.structure_type == structure_type)
        .map(|(loc, _)| loc)
        .collect();
    locations.sort();
    locations
}

/// Whether a built structure of the given type sits on the tile.
pub fn has_structure(view: &dyn ZoneView, loc: Location, structure_type: StructureType) -> bool {
    view.structures_at(loc)
        .iter()
        .any(|s| s.structure_type == structure_type)
}

/// Whether anything on the tile, built or ordered, stops movement.
pub fn has_blocking_object(view: &dyn ZoneView, loc: Location) -> bool {
    view.structures_at(loc)
        .iter()
        .any(|s| s.structure_type.blocks_movement(s.owned))
        || view
            .order_at(loc)
            .map(|o| o.structure_type.blocks_movement(true))
            .unwrap_or(false)
}

/// Whether the tile holds the control point, a resource node or a mineral.
pub fn is_key_object(view: &dyn ZoneView, loc: Location) -> bool {
    view.control_point() == Some(loc)
        || view.resource_nodes().contains(&loc)
        || view.minerals().contains(&loc)
}
