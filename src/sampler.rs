/// Memory sampling: look up the current process in the OS process table.
///
/// The watchdog only ever needs a snapshot of its own process, so the lookup
/// is a single targeted refresh rather than a full table scan.
use std::sync::Mutex;
use sysinfo::{ProcessesToUpdate, System};

/// Point-in-time memory snapshot of the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySample {
    pub pid: u32,
    /// Virtual memory size in bytes. This is the value compared against the
    /// configured ceiling.
    pub virtual_bytes: u64,
    /// Resident set size in bytes.
    pub resident_bytes: u64,
    /// Command line the process was started with, for diagnostics.
    pub command_line: String,
}

/// Produces memory snapshots of the current process.
///
/// `None` means the process table had no matching entry this cycle — "no
/// data", not an error. The watchdog skips the check and waits for the next
/// tick.
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> Option<MemorySample>;
}

/// Production sampler backed by the `sysinfo` process table.
///
/// Refreshing needs `&mut System`, so the table sits behind a mutex. Sampling
/// happens at most once every `check_interval` requests, so contention is a
/// non-issue.
pub struct SystemSampler {
    system: Mutex<System>,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for SystemSampler {
    fn sample(&self) -> Option<MemorySample> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                tracing::warn!(error = %e, "failed to resolve current pid");
                return None;
            }
        };

        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            // A panic while holding the lock leaves the table stale but
            // usable; treat it like any other missed cycle.
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = system.process(pid)?;
        let command_line = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        Some(MemorySample {
            pid: pid.as_u32(),
            virtual_bytes: process.virtual_memory(),
            resident_bytes: process.memory(),
            command_line,
        })
    }
}
