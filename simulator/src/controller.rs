//! Simulation controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use walletcore_ledger::{LedgerConfig, MemoryStore, TransferRequest, WalletService};

use crate::audit::{audit, AuditReport};
use crate::holders::{HolderFactory, WalletHolder};
use crate::metrics::SimulationMetrics;
use crate::scenario::{PlannedTransfer, Scenario};

/// Run parameters.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub wallets: usize,
    pub initial_balance: Decimal,
    pub transfers: usize,
    pub concurrency: usize,
    pub seed: Option<u64>,
    pub scenario: Scenario,
}

/// Controls the simulation.
pub struct SimulationController {
    config: SimulationConfig,
    /// Random number generator.
    rng: StdRng,
    store: MemoryStore,
    service: Arc<WalletService>,
    /// Funded holders.
    holders: Vec<WalletHolder>,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Wall time spent running transfers.
    elapsed: Duration,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(config: SimulationConfig, ledger: &LedgerConfig) -> Self {
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let store = MemoryStore::new();
        let service = Arc::new(WalletService::new(Arc::new(store.clone()), ledger));

        Self {
            config,
            rng,
            store,
            service,
            holders: Vec::new(),
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            elapsed: Duration::ZERO,
        }
    }

    /// Fund the simulated wallets.
    pub fn initialize(&mut self) {
        info!(
            wallets = self.config.wallets,
            initial_balance = %self.config.initial_balance,
            "Initializing simulation"
        );

        self.holders = HolderFactory::create_holders(
            &self.store,
            self.config.wallets,
            self.config.initial_balance,
        );

        for holder in &self.holders {
            debug!(holder = %holder.name, wallet_id = %holder.wallet_id, "Wallet funded");
        }
    }

    /// Money put into the system at initialization.
    pub fn funded_total(&self) -> Decimal {
        self.config.initial_balance * Decimal::from(self.holders.len() as u64)
    }

    /// Run the configured scenario to completion.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let plan = self.config.scenario.plan(
            &mut self.rng,
            self.holders.len(),
            self.config.transfers,
            self.config.initial_balance,
        )?;

        info!(
            scenario = ?self.config.scenario,
            transfers = plan.len(),
            concurrency = self.config.concurrency,
            "Running scenario"
        );

        let start = Instant::now();
        stream::iter(plan)
            .map(|planned| self.execute(planned))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<()>>()
            .await;
        self.elapsed = start.elapsed();

        Ok(())
    }

    async fn execute(&self, planned: PlannedTransfer) {
        let origin = &self.holders[planned.origin];
        let destination = &self.holders[planned.destination];
        let request = TransferRequest::new(
            origin.actor.clone(),
            origin.wallet_id,
            destination.wallet_id,
            planned.amount,
        );

        let start = Instant::now();
        let result = self.service.transfer_funds(request).await;
        let latency = start.elapsed();

        match result {
            Ok(transfer) => {
                debug!(
                    transfer_id = %transfer.id,
                    from = %origin.name,
                    to = %destination.name,
                    amount = %planned.amount,
                    "Transfer committed"
                );
                self.metrics.write().await.record_success(latency);
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!(from = %origin.name, to = %destination.name, error = %err, "Transfer failed");
                }
                self.metrics
                    .write()
                    .await
                    .record_failure(err.error_code(), latency);
            }
        }
    }

    /// Audit the ledger against the funded total.
    pub async fn audit(&self) -> anyhow::Result<AuditReport> {
        audit(&self.store, &self.service, &self.holders, self.funded_total()).await
    }

    /// Get simulation metrics.
    pub async fn get_metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    /// Wall time of the last run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
