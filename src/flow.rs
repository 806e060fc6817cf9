//! Synthetic order-flow generator.
//!
//! Deterministic, configurable stream of submissions for replay tests and
//! benchmarks. Same seed ⇒ same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::engine::Exchange;
use crate::error::Result;
use crate::types::{OrderKind, OrderRef, PartyId, Side};

/// Configuration for the synthetic flow generator. Ranges are inclusive.
#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// RNG seed. Same seed ⇒ same submission stream.
    pub seed: u64,
    /// Number of submissions to generate.
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Probability of Limit, then Stop (remainder is Market).
    pub limit_ratio: f64,
    pub stop_ratio: f64,
    /// Price range for limit/stop orders.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range, whole security units.
    pub quantity_min: u64,
    pub quantity_max: u64,
    /// Number of distinct parties (1..=num_parties).
    pub num_parties: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_orders: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.7,
            stop_ratio: 0.1,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 20,
            num_parties: 5,
        }
    }
}

/// One generated submission for [`Exchange::new_order`].
#[derive(Clone, Debug)]
pub struct Submission {
    pub party: PartyId,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
}

/// Deterministic submission stream. Create with [`FlowGenerator::new`].
pub struct FlowGenerator {
    rng: StdRng,
    config: FlowConfig,
}

impl FlowGenerator {
    pub fn new(config: FlowConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { rng, config }
    }

    /// Generates the next submission, advancing the RNG.
    pub fn next_submission(&mut self) -> Submission {
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let r = self.rng.gen::<f64>();
        let kind = if r < self.config.limit_ratio {
            OrderKind::Limit
        } else if r < self.config.limit_ratio + self.config.stop_ratio {
            OrderKind::Stop
        } else {
            OrderKind::Market
        };
        let price = match kind {
            OrderKind::Market => None,
            _ => Some(Decimal::from(
                self.rng.gen_range(self.config.price_min..=self.config.price_max),
            )),
        };
        let quantity = Decimal::from(
            self.rng
                .gen_range(self.config.quantity_min..=self.config.quantity_max),
        );
        let party = PartyId(self.rng.gen_range(1..=self.config.num_parties.max(1)));
        Submission {
            party,
            side,
            kind,
            price,
            quantity,
        }
    }

    /// The full stream as defined by `config.num_orders`.
    pub fn all(&mut self) -> Vec<Submission> {
        (0..self.config.num_orders)
            .map(|_| self.next_submission())
            .collect()
    }
}

/// Replays submissions into an exchange. Returns the created references
/// paired with their submissions, in order.
pub fn replay(
    exchange: &mut Exchange,
    submissions: impl IntoIterator<Item = Submission>,
) -> Result<Vec<(Submission, OrderRef)>> {
    let mut out = Vec::new();
    for submission in submissions {
        let reference = exchange.new_order(
            submission.party,
            submission.side,
            submission.kind,
            submission.price,
            submission.quantity,
        )?;
        out.push((submission, reference));
    }
    Ok(out)
}
