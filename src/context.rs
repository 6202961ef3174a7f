use crate::config::PlannerConfig;
use crate::pathing::CostMatrixCache;
use log::*;

/// Everything a planning call needs besides the zone itself: the current
/// tick, configuration, and the caches that outlive a single call.
///
/// Owned by the per-tick driver and passed down explicitly.
pub struct PlanningContext {
    tick: u64,
    config: PlannerConfig,
    pub cost_matrices: CostMatrixCache,
    /// Returns elapsed host compute. Only used for diagnostics.
    clock: Option<Box<dyn Fn() -> f64>>,
}

impl PlanningContext {
    pub fn new(config: PlannerConfig) -> Self {
        PlanningContext {
            tick: 0,
            config,
            cost_matrices: CostMatrixCache::default(),
            clock: None,
        }
    }

    pub fn with_clock<F: Fn() -> f64 + 'static>(mut self, clock: F) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Current reading of the compute clock, if one is installed.
    pub fn elapsed(&self) -> Option<f64> {
        self.clock.as_ref().map(|clock| clock())
    }

    /// Log compute spent since `start` (a prior [`PlanningContext::elapsed`] reading).
    pub fn log_since(&self, label: &str, start: Option<f64>) {
        if let (Some(start), Some(now)) = (start, self.elapsed()) {
            debug!("{} took {:.3}", label, now - start);
        }
    }
}

impl Default for PlanningContext {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
