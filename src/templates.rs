//! Fixed per-tier base layouts, expressed as offsets from an anchor.
//!
//! Buildings sit on tiles where `dx + dy` is even so the odd tiles between
//! them stay open for movement. Each tier only lists what it adds; the
//! full layout at a tier is every template up to and including it.

use crate::constants::*;
use crate::location::*;
use crate::plan::PlannedBuilding;
use crate::structure::StructureType;
use fnv::{FnvHashMap, FnvHashSet};
use log::*;

pub const TEMPLATE_NAME: &str = "checkerboard";
pub const TEMPLATE_VERSION: u32 = 1;

/// A building at a relative offset from the template anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateBuilding {
    pub structure_type: StructureType,
    pub dx: i8,
    pub dy: i8,
    pub priority: u32,
}

#[derive(Clone, Debug)]
pub struct LayoutTemplate {
    pub name: &'static str,
    pub version: u32,
    pub tier: u8,
    pub buildings: Vec<TemplateBuilding>,
}

fn tb(structure_type: StructureType, dx: i8, dy: i8, priority: u32) -> TemplateBuilding {
    TemplateBuilding {
        structure_type,
        dx,
        dy,
        priority,
    }
}

fn extensions(offsets: &[(i8, i8)]) -> impl Iterator<Item = TemplateBuilding> + '_ {
    offsets
        .iter()
        .map(|&(dx, dy)| tb(StructureType::Extension, dx, dy, 80))
}

fn tier_buildings(tier: u8) -> Option<Vec<TemplateBuilding>> {
    use StructureType::*;

    let buildings = match tier {
        1 => vec![tb(Spawn, 0, 0, 100)],
        2 => extensions(&[(-1, -1), (1, -1), (-1, 1), (1, 1), (0, -2)]).collect(),
        3 => std::iter::once(tb(Tower, -2, 0, 95))
            .chain(extensions(&[(2, 0), (0, 2), (-2, -2), (2, -2), (-2, 2)]))
            .collect(),
        4 => std::iter::once(tb(Storage, 2, 2, 90))
            .chain(extensions(&[
                (-1, -3),
                (1, -3),
                (-3, -1),
                (3, -1),
                (-3, 1),
                (3, 1),
                (-1, 3),
                (1, 3),
                (-3, -3),
                (3, -3),
            ]))
            .collect(),
        5 => vec![tb(Tower, -3, 3, 95), tb(Link, 3, 3, 70), tb(Link, 0, -4, 70)]
            .into_iter()
            .chain(extensions(&[
                (-4, 0),
                (4, 0),
                (0, 4),
                (-2, -4),
                (2, -4),
                (-4, -2),
                (4, -2),
                (-4, 2),
                (4, 2),
                (-2, 4),
            ]))
            .collect(),
        6 => vec![
            tb(Terminal, 2, 4, 75),
            tb(Link, -4, -4, 70),
            tb(Lab, 4, -4, 55),
            tb(Lab, -4, 4, 55),
            tb(Lab, 4, 4, 55),
        ]
        .into_iter()
        .chain(extensions(&[
            (-1, -5),
            (1, -5),
            (-5, -1),
            (5, -1),
            (-5, 1),
            (5, 1),
            (-1, 5),
            (1, 5),
            (-3, -5),
            (3, -5),
        ]))
        .collect(),
        7 => vec![
            tb(Spawn, -5, -3, 100),
            tb(Factory, 5, -3, 50),
            tb(Tower, -5, 3, 95),
            tb(Link, 5, 3, 70),
            tb(Lab, -3, 5, 55),
            tb(Lab, 3, 5, 55),
            tb(Lab, -5, -5, 55),
        ]
        .into_iter()
        .chain(extensions(&[
            (5, -5),
            (-5, 5),
            (5, 5),
            (0, -6),
            (-6, 0),
            (6, 0),
            (0, 6),
            (-2, -6),
            (2, -6),
            (-6, -2),
        ]))
        .collect(),
        8 => vec![
            tb(Spawn, 6, -2, 100),
            tb(PowerSpawn, -6, 2, 45),
            tb(Nuker, 6, 2, 40),
            tb(Observer, -2, 6, 35),
            tb(Tower, 2, 6, 95),
            tb(Tower, -4, -6, 95),
            tb(Tower, 4, -6, 95),
            tb(Link, -6, -4, 70),
            tb(Link, 6, -4, 70),
            tb(Lab, -6, 4, 55),
            tb(Lab, 6, 4, 55),
            tb(Lab, -4, 6, 55),
            tb(Lab, 4, 6, 55),
        ]
        .into_iter()
        .chain(extensions(&[
            (-6, -6),
            (6, -6),
            (-6, 6),
            (6, 6),
            (-1, -7),
            (1, -7),
            (-7, -1),
            (7, -1),
            (-7, 1),
            (7, 1),
        ]))
        .collect(),
        _ => return None,
    };

    Some(buildings)
}

/// The buildings a tier adds, or `None` outside 1..=8.
pub fn template(tier: u8) -> Option<LayoutTemplate> {
    tier_buildings(tier).map(|buildings| LayoutTemplate {
        name: TEMPLATE_NAME,
        version: TEMPLATE_VERSION,
        tier,
        buildings,
    })
}

/// Every template from tier 1 up to and including `tier`.
pub fn templates_up_to_tier(tier: u8) -> Vec<LayoutTemplate> {
    (1..=tier.min(MAX_TIER)).filter_map(template).collect()
}

/// Concatenation of every template's buildings from tier 1 through `tier`.
pub fn buildings_up_to_tier(tier: u8) -> Vec<TemplateBuilding> {
    templates_up_to_tier(tier)
        .into_iter()
        .flat_map(|t| t.buildings)
        .collect()
}

/// Ceiling of every structure type at the tier.
pub fn structure_limits(tier: u8) -> FnvHashMap<StructureType, u32> {
    StructureType::ALL
        .iter()
        .map(|&structure_type| (structure_type, structure_limit(structure_type, tier)))
        .collect()
}

/// Every template tile of every tier around the anchor. Dynamic placement
/// and roads stay off these so later tiers find their slots free.
pub fn reserved_tiles(anchor: Location) -> FnvHashSet<Location> {
    buildings_up_to_tier(MAX_TIER)
        .iter()
        .filter_map(|b| anchor.checked_add(b.dx, b.dy))
        .collect()
}

/// Translate a template to absolute tiles. Buildings landing outside the
/// interior band are dropped.
pub fn apply_template(template: &LayoutTemplate, anchor: Location) -> Vec<PlannedBuilding> {
    let reason = format!("template {} v{} tier {}", template.name, template.version, template.tier);

    template
        .buildings
        .iter()
        .filter_map(|b| {
            let x = anchor.x() as i16 + b.dx as i16;
            let y = anchor.y() as i16 + b.dy as i16;
            if !in_interior(x, y) {
                return None;
            }
            Some(PlannedBuilding::new(
                b.structure_type,
                Location::from_xy(x as u8, y as u8),
                b.priority,
                template.tier,
                reason.clone(),
            ))
        })
        .collect()
}

/// True if no structure type in the template exceeds the ceiling of its tier.
pub fn validate_template(template: &LayoutTemplate) -> bool {
    let mut counts: FnvHashMap<StructureType, u32> = FnvHashMap::default();
    for b in &template.buildings {
        *counts.entry(b.structure_type).or_insert(0) += 1;
    }

    let mut valid = true;
    for (structure_type, count) in counts {
        let limit = structure_limit(structure_type, template.tier);
        if count > limit {
            error!(
                "Template {} tier {} has {} {:?}, ceiling is {}",
                template.name, template.tier, count, structure_type, limit
            );
            valid = false;
        }
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tiers_outside_range_have_no_template() {
        assert!(template(0).is_none());
        assert!(template(9).is_none());
        for tier in 1..=MAX_TIER {
            assert_eq!(template(tier).unwrap().tier, tier);
        }
    }

    #[test]
    fn cumulative_templates_respect_ceilings() {
        for tier in 1..=MAX_TIER {
            let buildings = buildings_up_to_tier(tier);
            let limits = structure_limits(tier);
            let mut counts: FnvHashMap<StructureType, u32> = FnvHashMap::default();
            for b in &buildings {
                *counts.entry(b.structure_type).or_insert(0) += 1;
            }
            for (structure_type, count) in counts {
                assert!(
                    count <= limits[&structure_type],
                    "tier {} has {} {:?}",
                    tier,
                    count,
                    structure_type
                );
            }
            assert!(validate_template(&template(tier).unwrap()));
        }
    }

    #[test]
    fn offsets_never_overlap_and_stay_on_even_tiles() {
        let mut seen = HashSet::new();
        for b in buildings_up_to_tier(MAX_TIER) {
            assert!(seen.insert((b.dx, b.dy)), "duplicate offset {:?}", (b.dx, b.dy));
            assert_eq!((b.dx as i16 + b.dy as i16).rem_euclid(2), 0);
        }
        assert_eq!(seen.len(), 91);
    }

    #[test]
    fn tier_one_is_a_single_anchor() {
        let buildings = buildings_up_to_tier(1);
        assert_eq!(buildings, vec![tb(StructureType::Spawn, 0, 0, 100)]);
    }

    #[test]
    fn apply_drops_buildings_outside_interior() {
        let t = template(2).unwrap();
        let placed = apply_template(&t, Location::from_xy(1, 25));
        // Offsets with dx = -1 land on the edge column.
        assert_eq!(placed.len(), 3);
        assert!(placed.iter().all(|b| b.location.is_interior()));
        assert!(placed.iter().all(|b| b.min_tier == 2));

        let centered = apply_template(&t, Location::from_xy(25, 25));
        assert_eq!(centered.len(), 5);
        assert_eq!(centered[0].location, Location::from_xy(24, 24));
    }

    #[test]
    fn reserved_tiles_cover_every_tier() {
        let reserved = reserved_tiles(Location::from_xy(25, 25));
        assert_eq!(reserved.len(), 91);
        assert!(reserved.contains(&Location::from_xy(25, 25)));
        assert!(reserved.contains(&Location::from_xy(32, 24)));
        assert!(!reserved.contains(&Location::from_xy(26, 25)));
    }

    #[test]
    fn overfull_template_is_rejected() {
        let t = LayoutTemplate {
            name: "bad",
            version: 1,
            tier: 2,
            buildings: (0..6).map(|i| tb(StructureType::Extension, i * 2, 0, 80)).collect(),
        };
        assert!(!validate_template(&t));
    }
}
