//! Property-based and deterministic invariant tests.
//!
//! Uses proptest to generate (seed, num_orders); replays synthetic flow into
//! the exchange and asserts: no self-trades, no negative quantities, quantity
//! conservation, and book/store consistency. Deterministic replay: same
//! config ⇒ same outcome.

use proptest::prelude::*;
use rust_decimal::Decimal;
use token_market_engine::{
    replay, Exchange, ExchangeConfig, FlowConfig, FlowGenerator, OrderKind, OrderRef, OrderStatus,
    PartyId, RecordingGateway, Submission, TokenId, TradeTerms,
};

const SECURITY: TokenId = TokenId(1);
const CURRENCY: TokenId = TokenId(2);
const OPERATOR: PartyId = PartyId(900);
const AGENT: PartyId = PartyId(901);

fn exchange() -> (Exchange, RecordingGateway) {
    let gateway = RecordingGateway::new();
    let config = ExchangeConfig::new(SECURITY, CURRENCY, OPERATOR, AGENT);
    (Exchange::new(config, Box::new(gateway.clone())), gateway)
}

/// Invariant: every reported trade pairs two distinct parties at a positive
/// price and quantity.
fn assert_well_formed_trades(posted: &[TradeTerms]) {
    for terms in posted {
        assert!(terms.quantity > Decimal::ZERO, "trade quantity must be positive");
        assert!(terms.price > Decimal::ZERO, "trade price must be positive");
        assert_ne!(
            terms.maker_party, terms.taker_party,
            "a party must never trade with itself"
        );
    }
}

/// Invariant: filled quantity across all orders equals twice the traded
/// quantity (each trade debits one buy leg and one sell leg), and remaining
/// quantity is zero exactly for Filled orders.
fn assert_quantity_conservation(
    exchange: &Exchange,
    submitted: &[(Submission, OrderRef)],
    posted: &[TradeTerms],
) {
    let traded: Decimal = posted.iter().map(|t| t.quantity).sum();
    let mut filled_total = Decimal::ZERO;
    for (submission, reference) in submitted {
        let order = exchange
            .order(OPERATOR, *reference)
            .expect("no order is retired without a settlement confirm");
        assert!(order.quantity >= Decimal::ZERO, "remaining must be non-negative");
        assert_eq!(
            order.quantity.is_zero(),
            order.status == OrderStatus::Filled,
            "zero remaining exactly when Filled"
        );
        filled_total += submission.quantity - order.quantity;
    }
    assert_eq!(filled_total, traded + traded, "two legs per trade");
}

/// Invariant: every sub-book entry points at a live, active order of the
/// matching side of the book.
fn assert_book_matches_store(exchange: &Exchange) {
    for kind in [OrderKind::Market, OrderKind::Limit, OrderKind::Stop] {
        for reference in exchange.book().sub_book(kind).refs() {
            let order = exchange
                .order(OPERATOR, *reference)
                .expect("indexed order must exist in the store");
            assert!(order.status.is_active(), "indexed order must be active");
            assert!(order.quantity > Decimal::ZERO);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// For any (seed, num_orders) in range: after replaying the generated
    /// stream, trades are well formed, quantity is conserved, and the book
    /// only indexes live orders.
    #[test]
    fn prop_invariants_hold_after_replay(seed in 0u64..100_000u64, num_orders in 10usize..150usize) {
        let config = FlowConfig {
            seed,
            num_orders,
            ..Default::default()
        };
        let submissions = FlowGenerator::new(config).all();
        let (mut exchange, gateway) = exchange();
        let submitted = replay(&mut exchange, submissions).unwrap();

        let posted = gateway.posted();
        assert_well_formed_trades(&posted);
        assert_quantity_conservation(&exchange, &submitted, &posted);
        assert_book_matches_store(&exchange);
        prop_assert_eq!(exchange.pending_trades(), posted.len());
    }
}

/// Deterministic replay: same config ⇒ same (trade count, total traded
/// quantity, final clearing price).
#[test]
fn deterministic_replay_same_seed_same_outcome() {
    let config = FlowConfig {
        seed: 999,
        num_orders: 80,
        ..Default::default()
    };

    let submissions1 = FlowGenerator::new(config.clone()).all();
    let (mut exchange1, gateway1) = exchange();
    replay(&mut exchange1, submissions1).unwrap();

    let submissions2 = FlowGenerator::new(config).all();
    let (mut exchange2, gateway2) = exchange();
    replay(&mut exchange2, submissions2).unwrap();

    let posted1 = gateway1.posted();
    let posted2 = gateway2.posted();
    assert_eq!(posted1.len(), posted2.len(), "same number of trades");
    let total1: Decimal = posted1.iter().map(|t| t.quantity).sum();
    let total2: Decimal = posted2.iter().map(|t| t.quantity).sum();
    assert_eq!(total1, total2, "same total traded quantity");
    assert_eq!(exchange1.last_price(), exchange2.last_price(), "same clearing price");
}
