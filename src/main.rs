use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use guildsweep::config::Settings;
use guildsweep::input::{self, DataFiles};
use guildsweep::orchestrator::Orchestrator;
use guildsweep::output::OutputPaths;
use guildsweep::pipeline::Mode;

/// Bulk Discord guild maintenance across many accounts
#[derive(Parser)]
#[command(name = "guildsweep")]
#[command(about = "Validate tokens, collect guild lists, and leave guilds in bulk", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check every profile's token and write the valid/invalid tables
    Validate,
    /// Enumerate guild memberships and update the combined listing
    Collect,
    /// Leave the guilds listed in data/guilds_leave.txt
    Leave,
}

impl From<&Command> for Mode {
    fn from(command: &Command) -> Self {
        match command {
            Command::Validate => Mode::Validate,
            Command::Collect => Mode::Collect,
            Command::Leave => Mode::Leave,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = match init_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command).await {
        error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Console layer filtered by verbosity plus a plain-text file layer under
/// `logs/`. The returned guard keeps the file writer flushing until exit.
fn init_logging(verbose: u8) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    std::fs::create_dir_all("logs").context("failed to create logs directory")?;
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_file = format!("guildsweep_{stamp}.log");
    let file_appender = tracing_appender::rolling::never("logs", &log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(verbose >= 2))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    info!("Logging to file: logs/{log_file}");
    Ok(guard)
}

async fn run(command: Option<Command>) -> Result<()> {
    let settings = Settings::from_env();
    info!("Configuration loaded:");
    info!(
        "  - Processing lines: {} to {}",
        settings.start_line, settings.end_line
    );
    info!("  - Thread count: {}", settings.thread_count);
    info!("  - Random start: {}", settings.random_start);
    info!(
        "  - Account delay: {}-{} seconds",
        settings.account_delay.0, settings.account_delay.1
    );

    let files = DataFiles::new("data");
    let outputs = OutputPaths::new("output");
    if !files.ensure_required()? {
        return Ok(());
    }
    outputs.ensure()?;

    let mode = match &command {
        Some(command) => Mode::from(command),
        None => select_mode()?,
    };
    info!("Mode selected: {}", mode.label());

    let profiles = input::build_profiles(&settings, &files)?;
    let orchestrator = Orchestrator::new(settings, files, outputs);
    orchestrator.run(mode, profiles).await?;

    info!("");
    info!("Check the 'output' folder for results");
    info!("Check the 'logs' folder for detailed logs");
    Ok(())
}

/// Interactive numbered menu shown when no subcommand was given.
fn select_mode() -> Result<Mode> {
    println!();
    println!("{}", "=".repeat(60));
    println!("         GUILDSWEEP - DISCORD GUILD MANAGER");
    println!("{}", "=".repeat(60));
    println!("  1 - Validate tokens");
    println!("  2 - Collect guilds (save to CSV)");
    println!("  3 - Leave guilds (from list)");
    println!("{}", "=".repeat(60));
    print!("Select action (1-3): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("failed to read menu selection")?;
    parse_choice(input.trim()).context("Invalid choice! Expected 1-3.")
}

fn parse_choice(input: &str) -> Option<Mode> {
    match input {
        "1" => Some(Mode::Validate),
        "2" => Some(Mode::Collect),
        "3" => Some(Mode::Leave),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_maps_to_modes() {
        assert_eq!(parse_choice("1"), Some(Mode::Validate));
        assert_eq!(parse_choice("2"), Some(Mode::Collect));
        assert_eq!(parse_choice("3"), Some(Mode::Leave));
    }

    #[test]
    fn choice_rejects_everything_else() {
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("0"), None);
        assert_eq!(parse_choice("4"), None);
        assert_eq!(parse_choice("validate"), None);
    }

    #[test]
    fn subcommands_map_to_modes() {
        assert_eq!(Mode::from(&Command::Validate), Mode::Validate);
        assert_eq!(Mode::from(&Command::Collect), Mode::Collect);
        assert_eq!(Mode::from(&Command::Leave), Mode::Leave);
    }
}
