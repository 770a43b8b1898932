use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide count of handled requests.
///
/// Starts at zero when the process starts, increments exactly once per fully
/// handled request, and is never reset or decremented. Cloning is cheap and
/// every clone observes the same counter.
#[derive(Debug, Clone, Default)]
pub struct RequestCounter {
    count: Arc<AtomicU64>,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one handled request and return the running total including it.
    ///
    /// The returned value is this request's position in the sequence 1, 2, 3,
    /// ... — concurrent callers each get a distinct position and no increment
    /// is ever lost.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current running total.
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_at_zero() {
        let counter = RequestCounter::new();
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_increment_returns_running_total() {
        let counter = RequestCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.increment(), 3);
        assert_eq!(counter.current(), 3);
    }

    #[test]
    fn test_clones_share_the_count() {
        let counter = RequestCounter::new();
        let clone = counter.clone();
        counter.increment();
        clone.increment();
        assert_eq!(counter.current(), 2);
        assert_eq!(clone.current(), 2);
    }

    #[test]
    fn test_no_lost_updates_under_concurrent_increments() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 10_000;

        let counter = RequestCounter::new();
        thread::scope(|s| {
            for _ in 0..THREADS {
                let counter = counter.clone();
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        counter.increment();
                    }
                });
            }
        });
        assert_eq!(counter.current(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_concurrent_increments_return_distinct_positions() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 1_000;

        let counter = RequestCounter::new();
        let mut seen: Vec<u64> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let counter = counter.clone();
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|_| counter.increment())
                            .collect::<Vec<u64>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        seen.sort_unstable();
        let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
        assert_eq!(seen, expected);
    }
}
