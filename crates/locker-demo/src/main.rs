//! Demo driver for the locker engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use locker_core::{LockerConfig, LockerError, LockerService, ManualClock, SizeTier};

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Parser)]
#[command(name = "locker")]
#[command(about = "Locker - in-memory compartment allocation demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the reference deposit / upgrade / pickup / expiry scenario
    Walkthrough,

    /// Deposit packages of one size until the locker refuses
    Fill {
        /// Requested size (small, medium, large)
        #[arg(short, long, default_value = "small")]
        tier: SizeTier,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;
    let clock = Arc::new(ManualClock::new(1000));
    let service = LockerService::new(config, clock.clone())?;

    match cli.command {
        Commands::Walkthrough => walkthrough(&service, &clock)?,
        Commands::Fill { tier } => fill(&service, tier),
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<LockerConfig> {
    let mut config = match path {
        Some(path) => LockerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LockerConfig::default(),
    };
    config.merge_with_env()?;
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn walkthrough(service: &LockerService, clock: &ManualClock) -> anyhow::Result<()> {
    println!("=== Locker System Demo ===");

    println!("\n[Action] Deposit Small Package");
    let first = service.deposit(SizeTier::Small)?;
    println!("Received Ticket: {first}");

    let remaining_small = service.available(SizeTier::Small);
    for _ in 0..remaining_small {
        service.deposit(SizeTier::Small)?;
    }

    println!("\n[Action] Deposit Small Package (small compartments full, expect Medium)");
    let upgraded = service.deposit(SizeTier::Small)?;
    println!("Received Ticket: {upgraded} (tier {})", upgraded.compartment.tier());

    println!("\n[Action] Pickup first ticket");
    println!("{}", service.pickup(first.code.as_str())?);

    let jump = expiry_jump(service.config().retention());
    println!("\n[Action] Simulate {} passing...", describe_days(jump));
    let large = service.deposit(SizeTier::Large)?;
    println!("Deposited Large package (to be expired): {large}");
    clock.advance(jump);

    println!("[Action] Running Cleanup...");
    let report = service.cleanup();
    for compartment in &report.reclaimed {
        println!("Expired package removed from {compartment}");
    }

    match service.pickup(large.code.as_str()) {
        Err(err @ LockerError::InvalidCode { .. }) => println!("Late pickup refused: {err}"),
        other => anyhow::bail!("expired code still accepted: {other:?}"),
    }

    println!("\nDemo Completed.");
    Ok(())
}

/// Time to skip so a fresh deposit is past the retention window
fn expiry_jump(retention: Duration) -> Duration {
    retention.saturating_add(ONE_DAY)
}

fn describe_days(span: Duration) -> String {
    let days = span.as_secs_f64() / ONE_DAY.as_secs_f64();
    format!("{days:.1} days")
}

fn fill(service: &LockerService, tier: SizeTier) {
    let mut granted = Vec::new();
    let refusal = loop {
        match service.deposit(tier) {
            Ok(ticket) => granted.push(ticket),
            Err(err) => break err,
        }
    };

    for ticket in &granted {
        println!("{ticket}");
    }
    let hint = if refusal.is_retryable() {
        " (retry after a pickup or sweep)"
    } else {
        ""
    };
    println!("\n{} deposits accepted; then: {refusal}{hint}", granted.len());
    for size in SizeTier::ALL {
        println!("  {size:<6} free: {}", service.available(size));
    }
}
