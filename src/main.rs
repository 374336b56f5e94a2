//! Command line entry point for the contest rating service
//!
//! Loads configuration and the rating snapshot, runs one rating operation
//! against it, and writes the snapshot back when the operation changed data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contest_rating::config::AppConfig;
use contest_rating::rating::{RatingCalculator, SeedRatingCalculator};
use contest_rating::service::AppState;
use contest_rating::standings::validate_contestants;
use contest_rating::types::{ContestId, Contestant, UserId, SYSTEM_DOMAIN};
use contest_rating::utils::format_delta;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Contest Rating - seed-based rating recalculation for online-judge contests
#[derive(Parser)]
#[command(
    name = "contest-rating",
    version,
    about = "Seed-based contest rating recalculation for online-judge domains",
    long_about = "Contest Rating computes Elo-style rating changes from the final standings of \
                 finished contests, keeps an append-only rating history per domain, and replays \
                 a domain's rated contests in chronological order."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Snapshot path override
    #[arg(short, long, value_name = "FILE", help = "Override rating snapshot path")]
    snapshot: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, help = "Print collected metrics in Prometheus text format")]
    print_metrics: bool,

    /// Dry run mode (validate config and snapshot, then exit)
    #[arg(long, help = "Validate configuration and snapshot without running a command")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compute deltas for a JSON list of contestants without touching storage
    Compute {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
    /// Rate one contest
    Process {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
        #[arg(long)]
        contest: ContestId,
    },
    /// Rate every rated contest of a domain in chronological order
    ProcessAll {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
    /// Clear a domain's ratings and replay all rated contests from scratch
    Recompute {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
    /// Remove rating history and current ratings, keep rated contests
    Clear {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
    /// Remove rating history, current ratings and rated contests
    Purge {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
    /// Mark a contest as rating-eligible
    AddContest {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
        #[arg(long)]
        contest: ContestId,
    },
    /// Remove a contest's rating eligibility
    DeleteContest {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
        #[arg(long)]
        contest: ContestId,
    },
    /// Undo the chronologically latest rated contest
    Rollback {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
    /// Show a user's rating history
    History {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
        #[arg(long)]
        user: UserId,
    },
    /// List rated contests in chronological order
    Contests {
        #[arg(long, default_value = SYSTEM_DOMAIN)]
        domain: String,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Compute { .. } | Command::History { .. } | Command::Contests { .. }
        )
    }
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(snapshot) = &args.snapshot {
        config.storage.snapshot_path = snapshot.clone();
    }

    contest_rating::config::validate_config(&config)?;
    Ok(config)
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Contest Rating {}", contest_rating::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Snapshot: {}", config.storage.snapshot_path.display());
    info!("   Initial rating: {}", config.rating.initial_rating);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Compute deltas for a standalone contestant list
fn run_compute(config: &AppConfig, input: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read contestants from {}", input.display()))?;
    let contestants: Vec<Contestant> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse contestants in {}", input.display()))?;
    validate_contestants(&contestants)
        .with_context(|| format!("Rejected contestants in {}", input.display()))?;

    let calculator = SeedRatingCalculator::new(config.seed_rating_config())?;
    let outcomes = calculator.compute_outcomes(&contestants);
    for outcome in &outcomes {
        info!(
            "user {} rank {}: {} -> {} ({})",
            outcome.user_id,
            outcome.rank,
            outcome.prior_rating,
            outcome.prior_rating + outcome.delta,
            format_delta(outcome.delta)
        );
    }
    print_json(&outcomes)
}

async fn run_command(state: &AppState, command: &Command) -> Result<()> {
    let service = state.service();

    match command {
        Command::Compute { input } => run_compute(state.config(), input),
        Command::Process { domain, contest } => {
            let records = service.process_contest_rating(domain, *contest).await?;
            print_json(&records)
        }
        Command::ProcessAll { domain } => {
            let summary = service.process_all_contest_ratings(domain).await?;
            print_json(&summary)
        }
        Command::Recompute { domain } => {
            let summary = service.recompute_all_ratings(domain).await?;
            print_json(&summary)
        }
        Command::Clear { domain } => service.clear_all_ratings(domain).await,
        Command::Purge { domain } => service.purge_all_ratings(domain).await,
        Command::AddContest { domain, contest } => {
            let rated = service.add_contest_to_rating(domain, *contest).await?;
            print_json(&rated)
        }
        Command::DeleteContest { domain, contest } => {
            let removed = service.delete_rating(domain, *contest).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Command::Rollback { domain } => {
            let contest = service.rollback_last_contest(domain).await?;
            print_json(&serde_json::json!({ "rolled_back": contest }))
        }
        Command::History { domain, user } => {
            let history = service.user_rating_history(domain, *user).await?;
            let current = service.user_rating(domain, *user).await?;
            print_json(&serde_json::json!({
                "user_id": user,
                "rating": current,
                "history": history,
            }))
        }
        Command::Contests { domain } => {
            let contests = service.rated_contests(domain).await?;
            print_json(&contests)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    let state = match AppState::load(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to load rating data: {:#}", e);
            std::process::exit(1);
        }
    };

    if args.dry_run {
        info!("Configuration and snapshot validation successful");
        return Ok(());
    }

    let Some(command) = &args.command else {
        error!("No command given, see --help");
        std::process::exit(2);
    };

    let result = run_command(&state, command).await;

    // Data written before a failure (earlier contests of a replay) is kept
    if command.mutates() {
        if let Err(e) = state.save() {
            error!("Failed to write snapshot: {:#}", e);
            std::process::exit(1);
        }
    }

    if args.print_metrics {
        print!("{}", state.metrics().render()?);
    }

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
