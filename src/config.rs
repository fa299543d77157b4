//! Executor-facing configuration (SPEC_FULL.md §4.9).

use std::time::Duration;

/// Tuning knobs shared by [`crate::executor::SerialExecutor`] and
/// [`crate::executor::PoolExecutor`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker count for the default [`crate::executor::RayonPool`]. Ignored
    /// by callers supplying their own [`crate::executor::WorkPool`].
    pub pool_size: usize,
    /// How long [`crate::graph::Graph`]'s idle wait backs off between
    /// condvar wake-ups while polling `num_to_execute`/`num_running`. A
    /// safety net against a missed notification, not the primary wake path.
    pub wait_poll_interval: Duration,
    /// Emit a `tracing::trace!` event every time a node transitions to
    /// scheduled. Off by default; the per-run volume scales with node
    /// count and this is meant for debugging a stalled graph, not routine
    /// operation.
    pub log_schedule_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus(),
            wait_poll_interval: Duration::from_micros(500),
            log_schedule_events: false,
        }
    }
}

impl EngineConfig {
    /// Starts a [`EngineConfigBuilder`] seeded with [`EngineConfig::default`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Starts from [`EngineConfig::default`] with `pool_size` overridden.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self::builder().pool_size(pool_size).build()
    }
}

/// Builder for [`EngineConfig`], following the same chained-setter
/// convention as the teacher's `*Builder` structs.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    pool_size: Option<usize>,
    wait_poll_interval: Option<Duration>,
    log_schedule_events: Option<bool>,
}

impl EngineConfigBuilder {
    /// Overrides the worker count for the bundled [`crate::executor::RayonPool`].
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Overrides the idle-wait condvar backoff interval.
    pub fn wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = Some(interval);
        self
    }

    /// Enables or disables `trace!`-level logging of `schedule` transitions.
    pub fn log_schedule_events(mut self, enabled: bool) -> Self {
        self.log_schedule_events = Some(enabled);
        self
    }

    /// Builds the [`EngineConfig`], defaulting any field left unset.
    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            pool_size: self.pool_size.unwrap_or(defaults.pool_size),
            wait_poll_interval: self.wait_poll_interval.unwrap_or(defaults.wait_poll_interval),
            log_schedule_events: self.log_schedule_events.unwrap_or(defaults.log_schedule_events),
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
