use serde::{Deserialize, Serialize};

/// Tunables for a [`LocalScheduler`](crate::LocalScheduler).
///
/// Every field has a default, so a partial (or empty) JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Abort `run` once this many passes have started. `None` runs until idle.
    pub max_passes: Option<u64>,
    /// Largest delay `schedule_timer` accepts.
    pub max_delay_ticks: u64,
    /// Passes an I/O operation takes to complete when submitted without an
    /// explicit latency. Values below 1 are treated as 1.
    pub io_latency_passes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_passes: None,
            max_delay_ticks: u64::MAX / 2,
            io_latency_passes: 1,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_passes(mut self, limit: u64) -> Self {
        self.max_passes = Some(limit);
        self
    }

    pub fn with_io_latency(mut self, passes: u32) -> Self {
        self.io_latency_passes = passes;
        self
    }

    pub(crate) fn io_latency(&self) -> u32 {
        self.io_latency_passes.max(1)
    }
}
