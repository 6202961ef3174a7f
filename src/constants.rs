use crate::structure::StructureType;

pub const ZONE_WIDTH: u8 = 50;
pub const ZONE_HEIGHT: u8 = 50;

/// First and last coordinate of the buildable interior band.
pub const INTERIOR_MIN: u8 = 1;
pub const INTERIOR_MAX: u8 = 48;

pub const ZONE_CENTER: (u8, u8) = (25, 25);

pub const MAX_TIER: u8 = 8;

/// Cost values stored in a cost matrix.
pub const COST_PLAIN: u8 = 1;
pub const COST_SWAMP: u8 = 5;
pub const COST_BLOCKED: u8 = 255;

/// Maximum number of a given structure type allowed at a given tier.
/// Returns 0 if the structure is not available at that tier.
///
/// Roads have no per-tier limits. Containers unlock with the first
/// production structures. Ramparts and walls share the same limits.
pub fn structure_limit(structure_type: StructureType, tier: u8) -> u32 {
    match structure_type {
        StructureType::Spawn => match tier {
            0 => 0,
            1..=6 => 1,
            7 => 2,
            _ => 3,
        },
        StructureType::Extension => match tier {
            0 | 1 => 0,
            2 => 5,
            3 => 10,
            4 => 20,
            5 => 30,
            6 => 40,
            7 => 50,
            _ => 60,
        },
        StructureType::Link => match tier {
            0..=4 => 0,
            5 => 2,
            6 => 3,
            7 => 4,
            _ => 6,
        },
        StructureType::Storage => match tier {
            0..=3 => 0,
            _ => 1,
        },
        StructureType::Tower => match tier {
            0..=2 => 0,
            3..=4 => 1,
            5..=6 => 2,
            7 => 3,
            _ => 6,
        },
        StructureType::Observer | StructureType::PowerSpawn | StructureType::Nuker => {
            match tier {
                0..=7 => 0,
                _ => 1,
            }
        }
        StructureType::Extractor | StructureType::Terminal => match tier {
            0..=5 => 0,
            _ => 1,
        },
        StructureType::Lab => match tier {
            0..=5 => 0,
            6 => 3,
            7 => 6,
            _ => 10,
        },
        StructureType::Factory => match tier {
            0..=6 => 0,
            _ => 1,
        },
        StructureType::Container => match tier {
            0 | 1 => 0,
            _ => 5,
        },
        StructureType::Rampart | StructureType::Wall => match tier {
            0 | 1 => 0,
            _ => 2500,
        },
        StructureType::Road => 2500,
    }
}

/// Return the minimum tier at which the Nth structure of a given type can be built.
/// `count` is 1-based. Returns `MAX_TIER + 1` if the count exceeds every ceiling.
pub fn min_tier_for_nth(structure_type: StructureType, count: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    for tier in 1..=MAX_TIER {
        if structure_limit(structure_type, tier) >= count {
            return tier;
        }
    }
    MAX_TIER + 1
}

#[inline]
pub fn in_interior(x: i16, y: i16) -> bool {
    (INTERIOR_MIN as i16..=INTERIOR_MAX as i16).contains(&x)
        && (INTERIOR_MIN as i16..=INTERIOR_MAX as i16).contains(&y)
}

#[inline]
pub fn in_zone_bounds(x: i16, y: i16) -> bool {
    (0..ZONE_WIDTH as i16).contains(&x) && (0..ZONE_HEIGHT as i16).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_never_decrease_with_tier() {
        for structure_type in StructureType::ALL {
            for tier in 1..MAX_TIER {
                assert!(
                    structure_limit(structure_type, tier)
                        <= structure_limit(structure_type, tier + 1),
                    "{:?} shrinks between tier {} and {}",
                    structure_type,
                    tier,
                    tier + 1
                );
            }
        }
    }

    #[test]
    fn storage_unlocks_once_at_tier_four() {
        assert_eq!(structure_limit(StructureType::Storage, 3), 0);
        assert_eq!(structure_limit(StructureType::Storage, 4), 1);
        assert_eq!(structure_limit(StructureType::Storage, 8), 1);
    }

    #[test]
    fn extensions_cap_at_sixty() {
        assert_eq!(structure_limit(StructureType::Extension, 2), 5);
        assert_eq!(structure_limit(StructureType::Extension, 8), 60);
    }

    #[test]
    fn nth_structure_tier() {
        assert_eq!(min_tier_for_nth(StructureType::Spawn, 1), 1);
        assert_eq!(min_tier_for_nth(StructureType::Spawn, 2), 7);
        assert_eq!(min_tier_for_nth(StructureType::Extension, 6), 3);
        assert_eq!(min_tier_for_nth(StructureType::Spawn, 4), MAX_TIER + 1);
    }

    #[test]
    fn interior_band_excludes_edges() {
        assert!(!in_interior(0, 10));
        assert!(!in_interior(49, 10));
        assert!(in_interior(1, 48));
    }
}
