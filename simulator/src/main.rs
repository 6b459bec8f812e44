//! walletcore Simulator
//!
//! Drives concurrent transfers through an in-memory ledger, then audits the
//! ledger invariants. Exits non-zero when the audit finds a violation.

use std::process::ExitCode;

use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod audit;
mod controller;
mod holders;
mod metrics;
mod scenario;

use audit::AuditReport;
use controller::{SimulationConfig, SimulationController};
use metrics::MetricsSummary;
use scenario::Scenario;

use walletcore_ledger::LedgerConfig;

/// walletcore Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "walletcore concurrent transfer simulator")]
struct Args {
    /// Number of wallets to create
    #[arg(short, long, default_value = "8")]
    wallets: usize,

    /// Opening balance of every wallet
    #[arg(long, default_value = "1000.00")]
    initial_balance: Decimal,

    /// Number of transfers to submit
    #[arg(short, long, default_value = "1000")]
    transfers: usize,

    /// Transfers in flight at once
    #[arg(short, long, default_value = "32")]
    concurrency: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "random")]
    scenario: Scenario,

    /// Emit JSON logs and a JSON summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    scenario: Scenario,
    seed: Option<u64>,
    metrics: MetricsSummary,
    audit: AuditReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    if args.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let ledger = LedgerConfig::from_env();
    ledger.validate().map_err(anyhow::Error::msg)?;

    info!("Starting walletcore Simulator");

    let mut controller = SimulationController::new(
        SimulationConfig {
            wallets: args.wallets,
            initial_balance: args.initial_balance,
            transfers: args.transfers,
            concurrency: args.concurrency,
            seed: args.seed,
            scenario: args.scenario,
        },
        &ledger,
    );

    controller.initialize();
    controller.run().await?;

    let metrics = controller.get_metrics().await;
    let report = controller.audit().await?;

    info!("Simulation complete");
    info!("Total transfers: {}", metrics.total_transfers);
    info!("Successful: {}", metrics.successful_transfers);
    info!("Failed: {}", metrics.failed_transfers);
    info!("Insufficient funds: {}", metrics.failures("INSUFFICIENT_FUNDS"));
    info!("Average latency: {}µs", metrics.average_latency_us());
    info!("p99 latency: {}µs", metrics.p99_latency_us());

    if args.json {
        let summary = Summary {
            scenario: args.scenario,
            seed: args.seed,
            metrics: metrics.summary(controller.elapsed()),
            audit: report.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if report.is_clean() {
        info!("Audit passed");
        Ok(ExitCode::SUCCESS)
    } else {
        error!(violations = report.violations.len(), "Audit failed");
        Ok(ExitCode::FAILURE)
    }
}
