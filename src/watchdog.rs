use crate::config::WatchdogConfig;
use crate::sampler::MemorySampler;
use std::sync::Arc;

/// Decision returned by the watchdog after a request has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do — keep serving.
    Proceed,
    /// Memory ceiling breached — the host should exit so the supervisor
    /// restarts the process with a clean footprint.
    Terminate,
}

/// Memory watchdog: decides, per handled request, whether to sample memory
/// and whether the process should terminate.
///
/// The watchdog itself never exits the process. It returns [`Action`] and the
/// pipeline wrapper owns how termination actually happens, which keeps the
/// decision logic testable against a stub sampler.
pub struct Watchdog {
    config: WatchdogConfig,
    sampler: Arc<dyn MemorySampler>,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig, sampler: Arc<dyn MemorySampler>) -> Self {
        Self { config, sampler }
    }

    pub fn is_active(&self) -> bool {
        self.config.active
    }

    /// Evaluate the watchdog for the request whose running total is `count`.
    ///
    /// Checks fire only on a tick: `count` past the warm-up threshold and an
    /// exact multiple of `check_interval`. On a tick the process's own memory
    /// is sampled and compared against the ceiling; a sampler miss means "no
    /// data this cycle" and the next multiple gets the next chance. Off a
    /// tick the sampler is never touched.
    pub fn observe(&self, count: u64) -> Action {
        if !self.config.active {
            return Action::Proceed;
        }
        if count <= self.config.min_handled_requests {
            return Action::Proceed;
        }
        // Exact modulus, not "at least every N": a skipped multiple is missed
        // rather than fired late.
        let Some(interval) = self.config.check_interval.filter(|n| *n > 0) else {
            return Action::Proceed;
        };
        if count % interval != 0 {
            return Action::Proceed;
        }

        let Some(sample) = self.sampler.sample() else {
            tracing::debug!(count, "memory check: no process table entry this cycle");
            return Action::Proceed;
        };

        tracing::info!(
            count,
            pid = sample.pid,
            virtual_bytes = sample.virtual_bytes,
            resident_bytes = sample.resident_bytes,
            command = %sample.command_line,
            "memory check"
        );

        if sample.virtual_bytes > self.config.max_memory_bytes {
            tracing::error!(
                pid = sample.pid,
                virtual_bytes = sample.virtual_bytes,
                max_memory_bytes = self.config.max_memory_bytes,
                "memory ceiling breached, requesting termination"
            );
            Action::Terminate
        } else {
            Action::Proceed
        }
    }
}
