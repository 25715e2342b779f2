//! Bounded-concurrency scheduling of account pipelines.
//!
//! The orchestrator owns all per-run shared state, spawns one task per
//! selected profile under a semaphore, staggers the launches, and reads the
//! aggregates for the final report only after every task has joined.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::aggregate::{LeaveLedger, TokenLog};
use crate::api::{GuildClient, RetryPolicy};
use crate::catalog::GuildCatalog;
use crate::config::Settings;
use crate::input::DataFiles;
use crate::output::{self, OutputPaths};
use crate::pipeline::{self, Mode};
use crate::profile::Profile;
use crate::proxy::ProxyChecker;
use crate::report;
use crate::stats::RunStats;

/// Everything shared across concurrently running pipelines. Created once
/// per run and dropped after the final report.
pub struct RunContext {
    pub settings: Settings,
    pub files: DataFiles,
    pub outputs: OutputPaths,
    pub client: GuildClient,
    pub checker: ProxyChecker,
    pub stats: RunStats,
    pub tokens: TokenLog,
    pub ledger: LeaveLedger,
    pub catalog: Mutex<GuildCatalog>,
}

/// Runs every selected profile through the pipeline and drives reporting.
pub struct Orchestrator {
    ctx: Arc<RunContext>,
}

impl Orchestrator {
    pub fn new(settings: Settings, files: DataFiles, outputs: OutputPaths) -> Self {
        let client = GuildClient::new(RetryPolicy::paced(settings.request_delay));
        Self::with_parts(settings, files, outputs, client, ProxyChecker::default())
    }

    /// Construction point for tests that swap in a mock API base URL or
    /// probe service list.
    pub fn with_parts(
        settings: Settings,
        files: DataFiles,
        outputs: OutputPaths,
        client: GuildClient,
        checker: ProxyChecker,
    ) -> Self {
        Self {
            ctx: Arc::new(RunContext {
                settings,
                files,
                outputs,
                client,
                checker,
                stats: RunStats::default(),
                tokens: TokenLog::new(),
                ledger: LeaveLedger::new(),
                catalog: Mutex::new(GuildCatalog::new()),
            }),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Process every profile under the concurrency limit, then flush
    /// outputs and print the final report. Completes even when every
    /// account fails.
    pub async fn run(&self, mode: Mode, profiles: Vec<Profile>) -> Result<()> {
        if profiles.is_empty() {
            error!("No suitable profiles to run.");
            return Ok(());
        }

        if mode == Mode::Leave && !self.ctx.files.leave_list().exists() {
            self.ctx.files.scaffold_leave_list()?;
            info!("Please add guilds to leave and run again!");
            return Ok(());
        }

        self.seed_catalog();

        info!("Ready to process {} profiles", profiles.len());
        match mode {
            Mode::Validate => info!("Starting token validation..."),
            Mode::Collect => info!("Starting guild collect mode..."),
            Mode::Leave => info!("Starting guild leave mode..."),
        }

        let semaphore = Arc::new(Semaphore::new(self.ctx.settings.thread_count));
        let total = profiles.len();
        let mut handles = Vec::with_capacity(total);
        for (idx, profile) in profiles.into_iter().enumerate() {
            let ctx = self.ctx.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("pipeline semaphore closed");
                info!("Profile {}: Starting guild processing", profile.identifier);
                pipeline::run_account(&ctx, &profile, mode).await;
            }));

            // Staggered start: a randomized pause between launches avoids a
            // burst of simultaneous first requests, independent of the
            // concurrency limit.
            if idx < total - 1 {
                let delay = stagger_delay(self.ctx.settings.account_delay);
                info!("Waiting {delay} seconds before next account...");
                sleep(Duration::from_secs(delay)).await;
            }
        }

        // Join barrier: aggregates are read only after this point.
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Account pipeline failed unexpectedly: {e}");
            }
        }

        if mode == Mode::Validate {
            self.flush_token_tables();
        }

        info!("");
        info!("{}", "=".repeat(60));
        info!("ALL OPERATIONS COMPLETED!");
        info!("{}", "=".repeat(60));
        report::print_final_report(&self.ctx.stats.snapshot(), &self.ctx.ledger);
        Ok(())
    }

    /// Seed the shared catalog from the combined listing left by earlier
    /// collect runs. Leave-mode name resolution and its whole-catalog-empty
    /// API fallback both key off this.
    fn seed_catalog(&self) {
        let path = self.ctx.outputs.combined_catalog();
        if !path.exists() {
            return;
        }
        match output::read_combined_catalog(&path) {
            Ok(loaded) if !loaded.is_empty() => {
                let mut catalog = self.ctx.catalog.lock().expect("catalog poisoned");
                for (id, name) in loaded.iter() {
                    catalog.insert(id, name);
                }
                info!("Loaded {} guilds from {}", catalog.len(), path.display());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to load guild database: {e:#}"),
        }
    }

    fn flush_token_tables(&self) {
        let invalid = self.ctx.tokens.sorted_invalid();
        if !invalid.is_empty() {
            let path = self.ctx.outputs.invalid_tokens();
            match output::write_token_report(&path, &invalid, "Invalid") {
                Ok(()) => warn!("Saved {} invalid tokens to {}", invalid.len(), path.display()),
                Err(e) => error!("Failed to save invalid tokens to CSV: {e:#}"),
            }
        }

        let valid = self.ctx.tokens.sorted_valid();
        if !valid.is_empty() {
            let path = self.ctx.outputs.valid_tokens();
            match output::write_token_report(&path, &valid, "Valid") {
                Ok(()) => info!("Saved {} valid tokens to {}", valid.len(), path.display()),
                Err(e) => error!("Failed to save valid tokens to CSV: {e:#}"),
            }
        }
    }
}

/// Whole-second stagger delay drawn from the configured band.
fn stagger_delay(range: (u64, u64)) -> u64 {
    let (low, high) = range;
    if high <= low {
        low
    } else {
        rand::rng().random_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stagger_delay_stays_in_band() {
        for _ in 0..100 {
            let delay = stagger_delay((1, 5));
            assert!((1..=5).contains(&delay));
        }
    }

    #[test]
    fn stagger_delay_handles_degenerate_band() {
        assert_eq!(stagger_delay((3, 3)), 3);
        assert_eq!(stagger_delay((5, 2)), 5);
    }
}
