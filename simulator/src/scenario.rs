//! Simulation scenarios.
//!
//! A scenario expands into a fixed plan of transfers between holder indices.
//! Plans are generated from a seeded RNG so a run can be replayed.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Traffic shape of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Random pairs and amounts; some transfers overdraw and get rejected.
    Random,
    /// Everyone pulls from the first wallet until it runs dry.
    Drain,
    /// Two wallets send to each other in both directions at once.
    PingPong,
}

/// One transfer of the plan, by holder index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub origin: usize,
    pub destination: usize,
    pub amount: Decimal,
}

impl Scenario {
    /// Build the plan for `transfers` transfers among `holders` wallets.
    pub fn plan(
        &self,
        rng: &mut StdRng,
        holders: usize,
        transfers: usize,
        initial_balance: Decimal,
    ) -> anyhow::Result<Vec<PlannedTransfer>> {
        if holders < 2 {
            anyhow::bail!("scenario {self:?} needs at least 2 wallets, got {holders}");
        }

        let plan = match self {
            Scenario::Random => {
                // Up to half an opening balance, in cents.
                let max_cents = (initial_balance * Decimal::from(50)).trunc();
                let max_cents = max_cents.to_i64().unwrap_or(i64::MAX).max(1);

                (0..transfers)
                    .map(|_| {
                        let origin = rng.gen_range(0..holders);
                        let mut destination = rng.gen_range(0..holders);
                        while destination == origin {
                            destination = rng.gen_range(0..holders);
                        }
                        PlannedTransfer {
                            origin,
                            destination,
                            amount: Decimal::new(rng.gen_range(1..=max_cents), 2),
                        }
                    })
                    .collect()
            }
            Scenario::Drain => {
                // Only four of these fit in the first wallet.
                let amount = (initial_balance / Decimal::from(4)).round_dp(2);
                let amount = amount.max(Decimal::new(1, 2));

                (0..transfers)
                    .map(|_| PlannedTransfer {
                        origin: 0,
                        destination: rng.gen_range(1..holders),
                        amount,
                    })
                    .collect()
            }
            Scenario::PingPong => (0..transfers)
                .map(|i| {
                    let (origin, destination) = if i % 2 == 0 { (0, 1) } else { (1, 0) };
                    PlannedTransfer {
                        origin,
                        destination,
                        amount: Decimal::ONE,
                    }
                })
                .collect(),
        };

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    #[test]
    fn test_random_plan_is_reproducible() {
        let first = Scenario::Random
            .plan(&mut StdRng::seed_from_u64(7), 5, 50, dec!(100))
            .unwrap();
        let second = Scenario::Random
            .plan(&mut StdRng::seed_from_u64(7), 5, 50, dec!(100))
            .unwrap();

        assert_eq!(first, second);
        assert!(first.iter().all(|t| t.origin != t.destination));
        assert!(first
            .iter()
            .all(|t| t.amount > Decimal::ZERO && t.amount <= dec!(50)));
    }

    #[test]
    fn test_drain_plan_targets_first_wallet() {
        let plan = Scenario::Drain
            .plan(&mut StdRng::seed_from_u64(1), 3, 10, dec!(100))
            .unwrap();

        assert!(plan.iter().all(|t| t.origin == 0 && t.destination != 0));
        assert!(plan.iter().all(|t| t.amount == dec!(25)));
    }

    #[test]
    fn test_ping_pong_alternates() {
        let plan = Scenario::PingPong
            .plan(&mut StdRng::seed_from_u64(1), 2, 4, dec!(10))
            .unwrap();

        let pairs: Vec<_> = plan.iter().map(|t| (t.origin, t.destination)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_plan_needs_two_wallets() {
        assert!(Scenario::Random
            .plan(&mut StdRng::seed_from_u64(1), 1, 4, dec!(10))
            .is_err());
    }
}
