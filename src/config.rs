use serde::{Deserialize, Serialize};

/// Linear-distance coefficients for dynamic placement scoring. These are
/// tuning values; only the rankings they produce matter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Score of a candidate standing on its reference point.
    pub base: f32,
    /// Penalty per tile of distance to the control point and resource nodes.
    pub production_penalty: f32,
    /// Penalty per tile of distance to the zone center.
    pub coverage_penalty: f32,
    /// Penalty per tile of distance to the first anchor.
    pub storage_penalty: f32,
    /// Penalty per tile of distance to the planning center.
    pub general_penalty: f32,
    /// Search radius around the planning center.
    pub search_radius: u8,
    /// Search radius around production reference points.
    pub production_radius: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            base: 100.0,
            production_penalty: 2.0,
            coverage_penalty: 1.5,
            storage_penalty: 3.0,
            general_penalty: 1.0,
            search_radius: 10,
            production_radius: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Ticks a terrain analysis stays valid.
    pub terrain_ttl: u64,
    /// Ticks a cost matrix stays valid.
    pub cost_matrix_ttl: u64,
    /// Ticks before a region plan is considered stale and rebuilt.
    pub plan_ttl: u64,
    /// Operation budget of a single path search.
    pub path_max_ops: u32,

    pub traffic_enabled: bool,
    pub traffic_ttl: u64,
    /// Raw visit count a tile needs before it counts as high traffic.
    pub min_traffic_threshold: u32,
    pub traffic_optimize_interval: u64,
    /// Fraction of `min_traffic_threshold` below which compaction drops a tile.
    pub traffic_compaction_ratio: f64,

    /// Concurrent open construction orders per zone.
    pub max_open_orders: usize,
    pub plan_interval: u64,
    pub construction_interval: u64,
    /// Road candidates at or above this priority skip the traffic requirement.
    pub road_priority_bypass: u32,
    pub max_exit_routes: usize,
    /// Radius of the ring search used to find a walkable central tile.
    pub center_search_radius: u8,

    pub scoring: ScoringWeights,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            terrain_ttl: 5000,
            cost_matrix_ttl: 1000,
            plan_ttl: 20000,
            path_max_ops: 2000,
            traffic_enabled: true,
            traffic_ttl: 500,
            min_traffic_threshold: 5,
            traffic_optimize_interval: 100,
            traffic_compaction_ratio: 0.25,
            max_open_orders: 5,
            plan_interval: 10,
            construction_interval: 20,
            road_priority_bypass: 80,
            max_exit_routes: 4,
            center_search_radius: 10,
            scoring: ScoringWeights::default(),
        }
    }
}

impl PlannerConfig {
    /// Parse a config from JSON. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Half of the open-order budget goes to roads.
    pub fn road_order_budget(&self) -> usize {
        self.max_open_orders / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            PlannerConfig::from_json(r#"{ "traffic_ttl": 1000, "scoring": { "base": 50.0 } }"#)
                .unwrap();
        assert_eq!(config.traffic_ttl, 1000);
        assert_eq!(config.terrain_ttl, 5000);
        assert_eq!(config.scoring.base, 50.0);
        assert_eq!(config.scoring.search_radius, 10);
    }

    #[test]
    fn road_budget_is_half() {
        let config = PlannerConfig::default();
        assert_eq!(config.road_order_budget(), 2);
    }
}
