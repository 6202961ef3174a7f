//! In-memory zone host for offline planning runs and tests.
//!
//! `SimZone` implements both host traits and rejects construction orders for
//! the same reasons a live host would.

use crate::constants::*;
use crate::error::OrderError;
use crate::location::*;
use crate::structure::StructureType;
use crate::terrain::*;
use crate::zone::*;
use fnv::FnvHashMap;
use uuid::Uuid;

pub struct SimZone {
    name: ZoneName,
    tier: u8,
    owned: bool,
    terrain: ZoneTerrain,
    control_point: Option<Location>,
    resource_nodes: Vec<Location>,
    minerals: Vec<Location>,
    structures: FnvHashMap<Location, Vec<StructureInfo>>,
    orders: FnvHashMap<Location, OrderInfo>,
    units: Vec<UnitObservation>,
    max_orders: usize,
    next_order: u128,
}

impl SimZone {
    pub fn new(name: impl Into<String>, terrain: ZoneTerrain) -> SimZone {
        SimZone {
            name: ZoneName::new(name),
            tier: 1,
            owned: true,
            terrain,
            control_point: None,
            resource_nodes: Vec::new(),
            minerals: Vec::new(),
            structures: FnvHashMap::default(),
            orders: FnvHashMap::default(),
            units: Vec::new(),
            max_orders: 100,
            next_order: 1,
        }
    }

    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_control_point(mut self, x: u8, y: u8) -> Self {
        self.control_point = Some(Location::from_xy(x, y));
        self
    }

    pub fn with_resource_node(mut self, x: u8, y: u8) -> Self {
        self.resource_nodes.push(Location::from_xy(x, y));
        self
    }

    pub fn with_mineral(mut self, x: u8, y: u8) -> Self {
        self.minerals.push(Location::from_xy(x, y));
        self
    }

    pub fn with_structure(mut self, x: u8, y: u8, structure_type: StructureType) -> Self {
        self.add_structure(Location::from_xy(x, y), structure_type, true);
        self
    }

    pub fn set_tier(&mut self, tier: u8) {
        self.tier = tier;
    }

    pub fn set_owned(&mut self, owned: bool) {
        self.owned = owned;
    }

    pub fn set_max_orders(&mut self, max_orders: usize) {
        self.max_orders = max_orders;
    }

    pub fn add_structure(&mut self, loc: Location, structure_type: StructureType, owned: bool) {
        let hits = default_hits(structure_type);
        self.structures.entry(loc).or_default().push(StructureInfo {
            structure_type,
            owned,
            hits,
            hits_max: hits,
        });
    }

    pub fn remove_structure(&mut self, loc: Location, structure_type: StructureType) {
        if let Some(items) = self.structures.get_mut(&loc) {
            items.retain(|s| s.structure_type != structure_type);
            if items.is_empty() {
                self.structures.remove(&loc);
            }
        }
    }

    pub fn set_structure_hits(&mut self, loc: Location, structure_type: StructureType, hits: u32) {
        if let Some(items) = self.structures.get_mut(&loc) {
            for item in items.iter_mut().filter(|s| s.structure_type == structure_type) {
                item.hits = hits.min(item.hits_max);
            }
        }
    }

    pub fn add_unit(&mut self, name: &str, x: u8, y: u8, role: &str) {
        self.units.push(UnitObservation {
            name: name.to_string(),
            position: ZonePosition::new(x, y, self.name.clone()),
            role: role.to_string(),
        });
    }

    pub fn clear_units(&mut self) {
        self.units.clear();
    }

    /// Finish every open construction order. Returns how many completed.
    pub fn complete_orders(&mut self) -> usize {
        let finished: Vec<(Location, OrderInfo)> = self.orders.drain().collect();
        for (loc, order) in &finished {
            self.add_structure(*loc, order.structure_type, true);
        }
        finished.len()
    }

    fn is_key_object(&self, loc: Location) -> bool {
        self.control_point == Some(loc)
            || self.resource_nodes.contains(&loc)
            || self.minerals.contains(&loc)
    }

    fn count_of(&self, structure_type: StructureType) -> usize {
        let built = self
            .structures
            .values()
            .flat_map(|items| items.iter())
            .filter(|s| s.structure_type == structure_type && s.owned)
            .count();
        let ordered = self
            .orders
            .values()
            .filter(|o| o.structure_type == structure_type)
            .count();
        built + ordered
    }

    fn validate_target(&self, loc: Location, structure_type: StructureType) -> bool {
        if structure_type == StructureType::Extractor {
            return self.minerals.contains(&loc) && !self.structures.contains_key(&loc);
        }
        if self.terrain.is_wall_at(loc) || self.is_key_object(loc) {
            return false;
        }
        if loc.is_edge() && structure_type != StructureType::Road {
            return false;
        }
        match self.structures.get(&loc) {
            None => true,
            Some(items) => {
                // Ramparts may cover anything; anything non-blocking may sit under a rampart.
                items.iter().all(|s| {
                    (structure_type == StructureType::Rampart
                        && s.structure_type != StructureType::Rampart)
                        || (s.structure_type == StructureType::Rampart
                            && structure_type != StructureType::Rampart)
                })
            }
        }
    }
}

fn default_hits(structure_type: StructureType) -> u32 {
    match structure_type {
        StructureType::Road => 5000,
        StructureType::Rampart | StructureType::Wall => 1,
        _ => 1000,
    }
}

impl ZoneView for SimZone {
    fn name(&self) -> &ZoneName {
        &self.name
    }

    fn tier(&self) -> u8 {
        self.tier
    }

    fn terrain(&self) -> &ZoneTerrain {
        &self.terrain
    }

    fn control_point(&self) -> Option<Location> {
        self.control_point
    }

    fn resource_nodes(&self) -> &[Location] {
        &self.resource_nodes
    }

    fn minerals(&self) -> &[Location] {
        &self.minerals
    }

    fn structures_at(&self, loc: Location) -> &[StructureInfo] {
        self.structures
            .get(&loc)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn structures(&self) -> Vec<(Location, StructureInfo)> {
        self.structures
            .iter()
            .flat_map(|(loc, items)| items.iter().map(move |s| (*loc, *s)))
            .collect()
    }

    fn order_at(&self, loc: Location) -> Option<OrderInfo> {
        self.orders.get(&loc).copied()
    }

    fn orders(&self) -> Vec<(Location, OrderInfo)> {
        self.orders.iter().map(|(loc, o)| (*loc, *o)).collect()
    }

    fn units(&self) -> &[UnitObservation] {
        &self.units
    }
}

impl ConstructionHost for SimZone {
    fn place_order(
        &mut self,
        loc: Location,
        structure_type: StructureType,
    ) -> Result<OrderHandle, OrderError> {
        if !self.owned {
            return Err(OrderError::NotOwner);
        }
        if self.orders.len() >= self.max_orders {
            return Err(OrderError::Full);
        }
        if self.orders.contains_key(&loc) || !self.validate_target(loc, structure_type) {
            return Err(OrderError::InvalidTarget);
        }
        if self.count_of(structure_type) as u32 >= structure_limit(structure_type, self.tier) {
            return Err(OrderError::TierTooLow);
        }

        let handle = OrderHandle(Uuid::from_u128(self.next_order));
        self.next_order += 1;
        self.orders.insert(
            loc,
            OrderInfo {
                handle,
                structure_type,
            },
        );
        Ok(handle)
    }

    fn cancel_order(&mut self, handle: OrderHandle) -> Result<(), OrderError> {
        let loc = self
            .orders
            .iter()
            .find(|(_, o)| o.handle == handle)
            .map(|(loc, _)| *loc)
            .ok_or(OrderError::NotFound)?;
        self.orders.remove(&loc);
        Ok(())
    }
}
