//! Final run reporting.
//!
//! Rendered through the logging pipeline at the end of a run, after every
//! pipeline has joined. The leave section caps per-guild detail at a small
//! number of problem guilds to keep large-batch output readable.

use tracing::{info, warn};

use crate::aggregate::{LeaveLedger, LeaveSummary, ProblemGuild};
use crate::stats::StatsSnapshot;

/// Problem guilds shown in full detail before the report switches to the
/// top-N summary form.
const MAX_DETAILED_PROBLEMS: usize = 5;

fn percentage(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64 * 100.0
}

/// Truncate a guild id for the compact problem listing.
fn short_id(id: &str) -> String {
    if id.chars().count() <= 8 {
        id.to_string()
    } else {
        format!("{}...", id.chars().take(8).collect::<String>())
    }
}

/// Print the end-of-run statistics report, including the leave section when
/// any leave operation ran.
pub fn print_final_report(stats: &StatsSnapshot, ledger: &LeaveLedger) {
    info!("{}", "=".repeat(80));
    info!("FINAL EXECUTION REPORT");
    info!("{}", "=".repeat(80));

    info!("ACCOUNTS:");
    info!("   - Total processed: {}", stats.accounts_processed);
    info!("   - Skipped (proxy failed): {}", stats.accounts_skipped_proxy);
    info!(
        "   - Successfully processed: {}",
        stats.accounts_processed - stats.accounts_skipped_proxy
    );

    info!("");
    info!("PROXY STATISTICS:");
    info!("   - Total checked: {}", stats.proxy_checked);
    info!("   - Working proxies: {}", stats.proxy_working);
    info!("   - Failed proxies: {}", stats.proxy_failed);
    info!("   - No proxy (direct): {}", stats.proxy_empty);
    if stats.proxy_checked > 0 {
        info!(
            "   - Success rate: {:.1}%",
            percentage(stats.proxy_working, stats.proxy_checked)
        );
    }

    info!("");
    info!("TOKEN STATISTICS:");
    info!("   - Total checked: {}", stats.tokens_checked);
    info!("   - Valid tokens: {}", stats.tokens_valid);
    info!("   - Invalid tokens: {}", stats.tokens_invalid);
    if stats.tokens_checked > 0 {
        info!(
            "   - Valid rate: {:.1}%",
            percentage(stats.tokens_valid, stats.tokens_checked)
        );
    }

    if stats.guilds_collected > 0 {
        info!("");
        info!("GUILDS COLLECTED:");
        info!("   - Total guilds: {}", stats.guilds_collected);
        if stats.tokens_valid > 0 {
            info!(
                "   - Average per account: {:.1}",
                stats.guilds_collected as f64 / stats.tokens_valid as f64
            );
        }
    }

    if !ledger.is_empty() {
        print_leave_report(&ledger.summarize());
    }

    if stats.proxy_failed > 0 {
        warn!("");
        warn!("WARNING: {} proxy failures detected!", stats.proxy_failed);
        warn!("   Check your proxy configuration and credentials");
    }
    if stats.proxy_empty > 0 {
        warn!("");
        warn!(
            "SECURITY WARNING: {} accounts used a DIRECT connection!",
            stats.proxy_empty
        );
        warn!("   Your real IP was exposed to Discord");
        warn!("   Add proxies to data/proxies.txt to avoid detection");
    }
    if stats.tokens_invalid > 0 {
        warn!("");
        warn!("WARNING: {} invalid tokens detected!", stats.tokens_invalid);
        warn!("   Check output/invalid_tokens.csv for details");
    }

    info!("{}", "=".repeat(80));
    info!("Report generation completed");
    info!("{}", "=".repeat(80));
}

/// Leave-operations section: totals, classification, and capped detail for
/// the guilds that failed somewhere.
pub fn print_leave_report(summary: &LeaveSummary) {
    info!("");
    info!("{}", "=".repeat(60));
    info!("LEAVE OPERATIONS REPORT");
    info!("{}", "=".repeat(60));

    info!("");
    info!("SUMMARY:");
    info!("   - Guilds in leave list: {}", summary.total_guilds);
    info!("   - Total leave operations: {}", summary.total_operations);
    info!("   - Successful operations: {}", summary.total_successful);
    info!("   - Failed operations: {}", summary.total_failed);

    info!("");
    if summary.total_failed == 0 {
        info!(
            "Successfully left all {} guilds across all accounts!",
            summary.fully_successful.len()
        );
    } else {
        info!(
            "Successfully left {} guilds (all accounts)",
            summary.fully_successful.len()
        );
        if summary.partially_failed > 0 {
            info!("Partially failed: {} guilds (some accounts)", summary.partially_failed);
        }
        if summary.fully_failed > 0 {
            info!("Fully failed: {} guilds (all accounts)", summary.fully_failed);
        }

        info!("");
        info!("{}", "=".repeat(60));
        info!("FAILED TO LEAVE ({} guilds):", summary.problems.len());
        info!("{}", "=".repeat(60));

        if summary.problems.len() <= MAX_DETAILED_PROBLEMS {
            for problem in &summary.problems {
                print_problem_details(problem);
            }
        } else {
            info!("");
            info!("Top {MAX_DETAILED_PROBLEMS} most problematic guilds:");
            info!("");
            for (idx, problem) in summary
                .problems
                .iter()
                .take(MAX_DETAILED_PROBLEMS)
                .enumerate()
            {
                info!("{}. \"{}\" (ID: {})", idx + 1, problem.name, short_id(&problem.id));
                info!(
                    "   Failed on {}/{} accounts ({:.0}%)",
                    problem.failed,
                    problem.total,
                    problem.failure_rate()
                );
                info!("       Most common: {}", problem.most_common_reason);
                info!("");
            }
            info!(
                "... and {} more problematic guilds",
                summary.problems.len() - MAX_DETAILED_PROBLEMS
            );
            info!("");
        }
    }

    info!("{}", "=".repeat(60));
}

fn print_problem_details(problem: &ProblemGuild) {
    info!("");
    info!("+{}+", "-".repeat(58));
    info!("| Guild: \"{}\"", problem.name);
    info!("| ID: {}", problem.id);
    info!("+{}+", "-".repeat(58));
    info!("| Failed on {} account(s):", problem.failed);
    for (profile, reason) in &problem.failed_profiles {
        info!("|   - Profile {profile}: {reason}");
    }
    info!("|");
    info!("| Successfully left on {} account(s)", problem.success_count);
    info!("+{}+", "-".repeat(58));
}
