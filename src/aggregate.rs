//! Shared, concurrently-mutated result aggregation.
//!
//! One `LeaveLedger` and one `TokenLog` exist per run, created by the
//! orchestrator and handed by reference into every pipeline. All mutation
//! goes through their append methods under an internal mutex; readers run
//! only after the pipelines have joined.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::catalog::LeaveTarget;

/// Per-guild outcome record across all accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildOutcome {
    pub id: String,
    pub succeeded: Vec<u32>,
    /// Profile number → failure reason, kept sorted for reporting.
    pub failed: BTreeMap<u32, String>,
}

/// Cross-account leave results, keyed by resolved guild display name.
#[derive(Debug, Default)]
pub struct LeaveLedger {
    inner: Mutex<BTreeMap<String, GuildOutcome>>,
}

impl LeaveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, guild: &LeaveTarget, profile: u32) {
        let mut inner = self.inner.lock().expect("leave ledger poisoned");
        let outcome = inner.entry(guild.name.clone()).or_default();
        outcome.id = guild.id.clone();
        outcome.succeeded.push(profile);
    }

    pub fn record_failure(&self, guild: &LeaveTarget, profile: u32, reason: String) {
        let mut inner = self.inner.lock().expect("leave ledger poisoned");
        let outcome = inner.entry(guild.name.clone()).or_default();
        outcome.id = guild.id.clone();
        outcome.failed.insert(profile, reason);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("leave ledger poisoned").is_empty()
    }

    /// Classify and total everything recorded so far. Call after the join
    /// barrier for a consistent snapshot.
    pub fn summarize(&self) -> LeaveSummary {
        let inner = self.inner.lock().expect("leave ledger poisoned");

        let mut summary = LeaveSummary {
            total_guilds: inner.len(),
            ..LeaveSummary::default()
        };

        for (name, outcome) in inner.iter() {
            let successes = outcome.succeeded.len();
            let failures = outcome.failed.len();
            summary.total_operations += successes + failures;
            summary.total_successful += successes;
            summary.total_failed += failures;

            if failures == 0 && successes > 0 {
                summary.fully_successful.push(name.clone());
            } else if failures > 0 {
                if successes > 0 {
                    summary.partially_failed += 1;
                } else {
                    summary.fully_failed += 1;
                }
                summary.problems.push(ProblemGuild {
                    name: name.clone(),
                    id: outcome.id.clone(),
                    failed: failures,
                    total: successes + failures,
                    success_count: successes,
                    most_common_reason: most_common_reason(&outcome.failed),
                    failed_profiles: outcome
                        .failed
                        .iter()
                        .map(|(profile, reason)| (*profile, reason.clone()))
                        .collect(),
                });
            }
        }

        summary
            .problems
            .sort_by(|a, b| b.failed.cmp(&a.failed));
        summary
    }
}

/// One guild with at least one failed leave, ready for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemGuild {
    pub name: String,
    pub id: String,
    pub failed: usize,
    pub total: usize,
    pub success_count: usize,
    pub most_common_reason: String,
    /// Sorted by profile number.
    pub failed_profiles: Vec<(u32, String)>,
}

impl ProblemGuild {
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.failed as f64 / self.total as f64 * 100.0
    }
}

/// Aggregated view of the leave ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveSummary {
    pub total_guilds: usize,
    pub total_operations: usize,
    pub total_successful: usize,
    pub total_failed: usize,
    pub fully_successful: Vec<String>,
    pub partially_failed: usize,
    pub fully_failed: usize,
    /// Partially and fully failed guilds, worst (most failures) first.
    pub problems: Vec<ProblemGuild>,
}

fn most_common_reason(failed: &BTreeMap<u32, String>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for reason in failed.values() {
        *counts.entry(reason).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(reason, _)| reason.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Buffered (profile number, token) pairs awaiting the end-of-run tables.
#[derive(Debug, Default)]
pub struct TokenLog {
    valid: Mutex<Vec<(u32, String)>>,
    invalid: Mutex<Vec<(u32, String)>>,
}

impl TokenLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_valid(&self, profile: u32, token: &str) {
        self.valid
            .lock()
            .expect("token log poisoned")
            .push((profile, token.to_string()));
    }

    pub fn record_invalid(&self, profile: u32, token: &str) {
        self.invalid
            .lock()
            .expect("token log poisoned")
            .push((profile, token.to_string()));
    }

    pub fn sorted_valid(&self) -> Vec<(u32, String)> {
        let mut rows = self.valid.lock().expect("token log poisoned").clone();
        rows.sort();
        rows
    }

    pub fn sorted_invalid(&self) -> Vec<(u32, String)> {
        let mut rows = self.invalid.lock().expect("token log poisoned").clone();
        rows.sort();
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn target(name: &str, id: &str) -> LeaveTarget {
        LeaveTarget {
            name: name.to_string(),
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn concurrent_recording_loses_no_updates() {
        let ledger = Arc::new(LeaveLedger::new());

        // 10 guilds; per guild 10 successes and 5 failures from concurrent
        // tasks. Totals must come out exact.
        let mut handles = Vec::new();
        for guild_idx in 0..10u32 {
            for profile in 0..15u32 {
                let ledger = ledger.clone();
                handles.push(tokio::spawn(async move {
                    let t = LeaveTarget {
                        name: format!("guild-{guild_idx}"),
                        id: format!("10000000000000000{guild_idx}"),
                    };
                    if profile < 10 {
                        ledger.record_success(&t, profile);
                    } else {
                        ledger.record_failure(&t, profile, "HTTP 500".to_string());
                    }
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let summary = ledger.summarize();
        assert_eq!(summary.total_guilds, 10);
        assert_eq!(summary.total_operations, 150);
        assert_eq!(summary.total_successful, 100);
        assert_eq!(summary.total_failed, 50);
        assert_eq!(summary.partially_failed, 10);
    }

    #[test]
    fn classification_splits_guilds_three_ways() {
        let ledger = LeaveLedger::new();
        ledger.record_success(&target("clean", "1"), 1);
        ledger.record_success(&target("clean", "1"), 2);

        ledger.record_success(&target("mixed", "2"), 1);
        ledger.record_failure(&target("mixed", "2"), 2, "HTTP 500".to_string());

        ledger.record_failure(&target("broken", "3"), 1, "403 Forbidden - No permission".to_string());

        let summary = ledger.summarize();
        assert_eq!(summary.fully_successful, vec!["clean"]);
        assert_eq!(summary.partially_failed, 1);
        assert_eq!(summary.fully_failed, 1);
        assert_eq!(summary.problems.len(), 2);
    }

    #[test]
    fn problems_rank_by_failure_count_descending() {
        let ledger = LeaveLedger::new();
        ledger.record_failure(&target("one", "1"), 1, "HTTP 500".to_string());
        for profile in 1..=3 {
            ledger.record_failure(&target("three", "3"), profile, "HTTP 500".to_string());
        }
        for profile in 1..=2 {
            ledger.record_failure(&target("two", "2"), profile, "HTTP 500".to_string());
        }

        let summary = ledger.summarize();
        let names: Vec<&str> = summary
            .problems
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["three", "two", "one"]);
    }

    #[test]
    fn most_common_reason_wins_by_count() {
        let ledger = LeaveLedger::new();
        ledger.record_failure(&target("g", "1"), 1, "Timeout: deadline".to_string());
        ledger.record_failure(&target("g", "1"), 2, "HTTP 500".to_string());
        ledger.record_failure(&target("g", "1"), 3, "HTTP 500".to_string());

        let summary = ledger.summarize();
        assert_eq!(summary.problems[0].most_common_reason, "HTTP 500");
        assert_eq!(summary.problems[0].failure_rate(), 100.0);
    }

    #[test]
    fn token_log_sorts_by_profile_number() {
        let log = TokenLog::new();
        log.record_invalid(9, "tok-nine");
        log.record_invalid(2, "tok-two");
        log.record_valid(5, "tok-five");

        assert_eq!(
            log.sorted_invalid(),
            vec![(2, "tok-two".to_string()), (9, "tok-nine".to_string())]
        );
        assert_eq!(log.sorted_valid(), vec![(5, "tok-five".to_string())]);
    }
}
