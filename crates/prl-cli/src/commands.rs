use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use prl_ledger::{Deposit, ValidationReport};
use prl_pool::{
    AllowAll, Collaborators, FundraisingState, InMemoryVault, Pool, PoolConfig, PoolSnapshot,
    TicketBook,
};
use prl_types::{Amount, Currency, DepositId, TicketId};

use crate::cli::*;
use crate::scenario::{RunReport, Runner, Scenario};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::Config => cmd_config(),
    }
}

fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    let runner = Runner::new(&scenario)?;
    let report = runner.run(&scenario.steps)?;

    if let Some(path) = &args.snapshot {
        let snapshot = runner.pool().snapshot()?;
        save_snapshot(&snapshot, path)?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_run(&report),
    }
    Ok(())
}

fn print_run(report: &RunReport) {
    for step in &report.steps {
        let mark = if step.ok { "✓".green() } else { "✗".red() };
        println!(
            "{} {:>3} {:<8} {}",
            mark,
            step.index,
            step.action.bold(),
            step.detail
        );
    }
    if report.currencies.is_empty() {
        println!("\nNo deposits recorded.");
        return;
    }
    println!();
    for (currency, summary) in &report.currencies {
        println!(
            "{}  deposited {}  paid {}  dust {}  swept {}",
            currency.cyan().bold(),
            summary.deposited,
            summary.paid.to_string().green(),
            summary.dust.to_string().yellow(),
            summary.swept
        );
    }
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let pool = restore_detached(snapshot.clone())
        .with_context(|| format!("snapshot {} is not a valid pool", args.snapshot.display()))?;
    let report = pool.validate()?;

    match format {
        OutputFormat::Json => {
            let view = InspectView {
                claim_count: snapshot.ledger.max_tickets,
                fundraising: snapshot.fundraising,
                deposits: &snapshot.ledger.deposits,
                redemptions: &snapshot.ledger.redemptions,
                paid: &snapshot.paid,
                swept: &snapshot.swept,
                valid: report.is_valid(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Text => print_inspect(&snapshot, &report),
    }
    Ok(())
}

/// Restore a snapshot into a pool wired to empty in-memory collaborators.
fn restore_detached(snapshot: PoolSnapshot) -> anyhow::Result<Pool> {
    let collaborators = Collaborators::in_memory(
        &Arc::new(TicketBook::new()),
        &Arc::new(InMemoryVault::new()),
        Arc::new(AllowAll),
    );
    Ok(Pool::restore(PoolConfig::default(), collaborators, snapshot)?)
}

#[derive(Serialize)]
struct InspectView<'a> {
    claim_count: u64,
    fundraising: FundraisingState,
    deposits: &'a [Deposit],
    redemptions: &'a [(TicketId, DepositId)],
    paid: &'a BTreeMap<Currency, Amount>,
    swept: &'a BTreeMap<Currency, Amount>,
    valid: bool,
}

fn print_inspect(snapshot: &PoolSnapshot, report: &ValidationReport) {
    let ledger = &snapshot.ledger;
    println!(
        "Claim count {}, fundraising {}, {} deposits, {} redemptions",
        ledger.max_tickets.to_string().bold(),
        snapshot.fundraising,
        ledger.deposits.len(),
        ledger.redemptions.len()
    );
    for deposit in &ledger.deposits {
        println!(
            "  {}  {} {}  over {} claims  (share {}, dust {})",
            deposit.id.to_string().yellow(),
            deposit.amount,
            deposit.currency.to_string().cyan(),
            deposit.max_tickets_at_deposit,
            deposit.share(),
            deposit.dust()
        );
    }
    for (currency, paid) in &snapshot.paid {
        let swept = snapshot.swept.get(currency).copied().unwrap_or(0);
        println!(
            "  {}  paid {}  swept {}",
            currency.to_string().cyan().bold(),
            paid.to_string().green(),
            swept
        );
    }
    if report.is_valid() {
        println!("{} Pool integrity verified", "✓".green().bold());
    } else {
        for violation in &report.violations {
            println!("{} {:?}: {}", "✗".red(), violation.kind, violation.description);
        }
    }
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", PoolConfig::default().to_toml_string()?);
    Ok(())
}

pub fn save_snapshot(snapshot: &PoolSnapshot, path: &Path) -> anyhow::Result<()> {
    let bytes = snapshot.to_bytes()?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write snapshot {}", path.display()))
}

pub fn load_snapshot(path: &Path) -> anyhow::Result<PoolSnapshot> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    PoolSnapshot::from_bytes(&bytes)
        .with_context(|| format!("failed to decode snapshot {}", path.display()))
}
