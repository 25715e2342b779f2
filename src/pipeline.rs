//! Per-account execution pipeline.
//!
//! Each selected profile runs the same sequence: proxy check, credential
//! check, then the mode's operation. A failed proxy or invalid token skips
//! the rest of the account without touching its siblings; retry lives inside
//! the API client, never here.

use tracing::{error, info, warn};

use crate::catalog::{LeaveTarget, Resolution};
use crate::input;
use crate::orchestrator::RunContext;
use crate::output;
use crate::profile::Profile;
use crate::proxy::ProxySpec;
use crate::stats::RunStats;

/// Selected operation for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Check every token and write the valid/invalid tables.
    Validate,
    /// Enumerate guild memberships and update the combined listing.
    Collect,
    /// Leave the guilds named in the leave list.
    Leave,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Validate => "TOKEN VALIDATION",
            Mode::Collect => "COLLECT GUILDS",
            Mode::Leave => "LEAVE GUILDS",
        }
    }
}

/// Run one account through the pipeline. All failures are handled and
/// logged here; the orchestrator only sees panics.
pub async fn run_account(ctx: &RunContext, profile: &Profile, mode: Mode) {
    let identifier = &profile.identifier;
    RunStats::bump(&ctx.stats.accounts_processed);

    if !ctx
        .checker
        .check(&profile.proxy, identifier, &ctx.stats)
        .await
    {
        RunStats::bump(&ctx.stats.accounts_skipped_proxy);
        error!("{identifier}: SKIPPING account due to invalid proxy (security measure)");
        return;
    }
    // The checker accepted the descriptor, so this parse cannot fail.
    let proxy = ProxySpec::parse(&profile.proxy).unwrap_or(ProxySpec::Direct);

    if !verify_credentials(ctx, &proxy, profile).await {
        warn!("{identifier}: Skipping profile due to invalid token");
        return;
    }

    match mode {
        Mode::Validate => {}
        Mode::Collect => collect_guilds(ctx, &proxy, profile).await,
        Mode::Leave => leave_guilds(ctx, &proxy, profile).await,
    }
}

/// Credential check plus the bookkeeping around it: counters and the
/// valid/invalid token buffers.
async fn verify_credentials(ctx: &RunContext, proxy: &ProxySpec, profile: &Profile) -> bool {
    RunStats::bump(&ctx.stats.tokens_checked);
    let valid = ctx
        .client
        .check_credentials(&profile.token, proxy, &profile.user_agent, &profile.identifier)
        .await;
    if valid {
        RunStats::bump(&ctx.stats.tokens_valid);
        ctx.tokens.record_valid(profile.number(), &profile.token);
    } else {
        RunStats::bump(&ctx.stats.tokens_invalid);
        ctx.tokens.record_invalid(profile.number(), &profile.token);
    }
    valid
}

async fn collect_guilds(ctx: &RunContext, proxy: &ProxySpec, profile: &Profile) {
    let identifier = &profile.identifier;

    // Collect mode seeds the leave list template so the next step has a
    // file to fill in.
    if let Err(e) = ctx.files.scaffold_leave_list() {
        warn!("{identifier}: {e:#}");
    }

    let guilds = ctx
        .client
        .fetch_guilds(&profile.token, proxy, &profile.user_agent, identifier)
        .await;
    if guilds.is_empty() {
        warn!("{identifier}: Guild list is empty or failed to load");
        return;
    }
    RunStats::add(&ctx.stats.guilds_collected, guilds.len() as u64);

    let listing = ctx.outputs.account_listing(identifier);
    match output::write_account_listing(&listing, &guilds) {
        Ok(()) => info!("{identifier}: Guild list saved to {}", listing.display()),
        Err(e) => error!("{identifier}: Failed to write guild list: {e:#}"),
    }

    // Merge into the shared catalog and rewrite the combined listing under
    // the same lock, so concurrent pipelines serialize on the file.
    let combined = ctx.outputs.combined_catalog();
    let write_result = {
        let mut catalog = ctx.catalog.lock().expect("catalog poisoned");
        catalog.merge_guilds(&guilds);
        output::write_combined_catalog(&combined, &catalog)
    };
    match write_result {
        Ok(()) => info!("{identifier}: List added to {}", combined.display()),
        Err(e) => error!("{identifier}: Error writing combined file: {e:#}"),
    }
}

async fn leave_guilds(ctx: &RunContext, proxy: &ProxySpec, profile: &Profile) {
    let identifier = &profile.identifier;

    let leave_path = ctx.files.leave_list();
    if !leave_path.exists() {
        error!("{identifier}: Leave list file not found: {}", leave_path.display());
        error!("{identifier}: Create the file or run guild collection first");
        return;
    }
    let entries = input::load_lines(&leave_path, 1, usize::MAX);
    if entries.is_empty() {
        warn!("{identifier}: Leave list is empty, nothing to do");
        return;
    }
    info!("{identifier}: Processing {} entries from leave list", entries.len());

    if !ensure_catalog(ctx, proxy, profile).await {
        return;
    }

    let targets = resolve_targets(ctx, &entries, identifier);
    if targets.is_empty() {
        warn!("{identifier}: No matching guilds found to leave");
        return;
    }
    info!("{identifier}: Found {} guilds to leave", targets.len());

    info!("{identifier}: Starting leave operations...");
    let total = targets.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for (idx, target) in targets.iter().enumerate() {
        info!("{identifier}: Leaving '{}' ({}/{total})...", target.name, idx + 1);
        let (ok, reason) = ctx
            .client
            .leave_guild(&profile.token, target, proxy, &profile.user_agent, identifier)
            .await;
        if ok {
            succeeded += 1;
            ctx.ledger.record_success(target, profile.number());
            info!("{identifier}: Left '{}' ({}/{total})", target.name, idx + 1);
        } else {
            failed += 1;
            let reason = reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            ctx.ledger
                .record_failure(target, profile.number(), reason.clone());
            error!(
                "{identifier}: Failed to leave '{}': {reason} ({}/{total})",
                target.name,
                idx + 1
            );
        }
    }

    info!("{identifier}: ===== LEAVE SUMMARY =====");
    info!("{identifier}: Total to leave: {total}");
    info!("{identifier}: Successful: {succeeded}");
    info!("{identifier}: Failed: {failed}");
}

/// Make sure the shared catalog has entries to resolve names against. The
/// live-fetch fallback fires only when the whole catalog is empty, never for
/// an individual missing name. Returns false when this account's leave run
/// cannot continue.
async fn ensure_catalog(ctx: &RunContext, proxy: &ProxySpec, profile: &Profile) -> bool {
    let identifier = &profile.identifier;
    {
        let catalog = ctx.catalog.lock().expect("catalog poisoned");
        if !catalog.is_empty() {
            info!("{identifier}: Guild database has {} entries", catalog.len());
            return true;
        }
    }

    warn!("{identifier}: Guild database (guilds_all.csv) not found or empty");
    info!("{identifier}: Fetching guilds from the Discord API...");
    let guilds = ctx
        .client
        .fetch_guilds(&profile.token, proxy, &profile.user_agent, identifier)
        .await;
    if guilds.is_empty() {
        error!("{identifier}: Failed to fetch guilds from API");
        return false;
    }

    let mut catalog = ctx.catalog.lock().expect("catalog poisoned");
    catalog.merge_guilds(&guilds);
    info!("{identifier}: Loaded {} guilds from API", catalog.len());
    true
}

fn resolve_targets(ctx: &RunContext, entries: &[String], identifier: &str) -> Vec<LeaveTarget> {
    let catalog = ctx.catalog.lock().expect("catalog poisoned");
    entries
        .iter()
        .filter_map(|entry| match catalog.resolve(entry) {
            Resolution::DirectId(target) => {
                info!("{identifier}: Using direct ID: {}", target.id);
                Some(target)
            }
            Resolution::Exact(target) => {
                info!(
                    "{identifier}: Found '{}' in database (ID: {})",
                    target.name, target.id
                );
                Some(target)
            }
            Resolution::CaseInsensitive(target) => {
                info!(
                    "{identifier}: Found '{}' (case-insensitive) in database (ID: {})",
                    target.name, target.id
                );
                Some(target)
            }
            Resolution::Unresolved => {
                warn!("{identifier}: Guild '{entry}' not found in database - skipping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_labels_match_menu_wording() {
        assert_eq!(Mode::Validate.label(), "TOKEN VALIDATION");
        assert_eq!(Mode::Collect.label(), "COLLECT GUILDS");
        assert_eq!(Mode::Leave.label(), "LEAVE GUILDS");
    }
}
