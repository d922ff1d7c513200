//! Per-step workload metrics.

use cadence_core::Tick;

/// Timing and workload metrics collected during a single step.
///
/// Populated by the simulator after every completed step; read the most
/// recent values via [`Sim::last_metrics()`](crate::Sim::last_metrics).
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Processes activated across all runners.
    pub lps_run: u64,
    /// Messages delivered to inboxes across all runners.
    pub messages_delivered: u64,
    /// Runners that skipped their run phase this step.
    pub runners_skipped: u32,
    /// The tick broadcast for this step.
    pub from_tick: Tick,
    /// The clock value the step advanced to.
    pub to_tick: Tick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.lps_run, 0);
        assert_eq!(m.messages_delivered, 0);
        assert_eq!(m.runners_skipped, 0);
        assert_eq!(m.from_tick, Tick(0));
        assert_eq!(m.to_tick, Tick(0));
    }
}
