//! Shared run counters.
//!
//! One `RunStats` is created per run and handed by reference to every
//! concurrent pipeline. All counters are atomic; the final report reads a
//! `StatsSnapshot` only after every pipeline has joined.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters incremented by concurrently running account pipelines.
#[derive(Debug, Default)]
pub struct RunStats {
    pub accounts_processed: AtomicU64,
    pub accounts_skipped_proxy: AtomicU64,
    pub proxy_checked: AtomicU64,
    pub proxy_working: AtomicU64,
    pub proxy_failed: AtomicU64,
    pub proxy_empty: AtomicU64,
    pub tokens_checked: AtomicU64,
    pub tokens_valid: AtomicU64,
    pub tokens_invalid: AtomicU64,
    pub guilds_collected: AtomicU64,
}

/// Plain-integer view of the counters, taken after the join barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accounts_processed: u64,
    pub accounts_skipped_proxy: u64,
    pub proxy_checked: u64,
    pub proxy_working: u64,
    pub proxy_failed: u64,
    pub proxy_empty: u64,
    pub tokens_checked: u64,
    pub tokens_valid: u64,
    pub tokens_invalid: u64,
    pub guilds_collected: u64,
}

impl RunStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accounts_processed: self.accounts_processed.load(Ordering::Relaxed),
            accounts_skipped_proxy: self.accounts_skipped_proxy.load(Ordering::Relaxed),
            proxy_checked: self.proxy_checked.load(Ordering::Relaxed),
            proxy_working: self.proxy_working.load(Ordering::Relaxed),
            proxy_failed: self.proxy_failed.load(Ordering::Relaxed),
            proxy_empty: self.proxy_empty.load(Ordering::Relaxed),
            tokens_checked: self.tokens_checked.load(Ordering::Relaxed),
            tokens_valid: self.tokens_valid.load(Ordering::Relaxed),
            tokens_invalid: self.tokens_invalid.load(Ordering::Relaxed),
            guilds_collected: self.guilds_collected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn counters_survive_concurrent_increments() {
        let stats = Arc::new(RunStats::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    RunStats::bump(&stats.tokens_checked);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(stats.snapshot().tokens_checked, 800);
    }

    #[test]
    fn add_accumulates() {
        let stats = RunStats::default();
        RunStats::add(&stats.guilds_collected, 12);
        RunStats::add(&stats.guilds_collected, 30);
        assert_eq!(stats.snapshot().guilds_collected, 42);
    }
}
