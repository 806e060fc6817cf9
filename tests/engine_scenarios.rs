//! End-to-end scenarios through the exchange facade: matching, trigger
//! cascades, and the two-phase settlement workflow.

use rust_decimal::Decimal;
use token_market_engine::{
    EngineError, Exchange, ExchangeConfig, OrderKind, OrderStatus, PartyId, RecordingGateway,
    Side, SwapDirection, SwapRequest, TokenId,
};

const SECURITY: TokenId = TokenId(1);
const CURRENCY: TokenId = TokenId(2);
const OPERATOR: PartyId = PartyId(900);
const AGENT: PartyId = PartyId(901);

fn init_log() {
    let _ = env_logger::try_init();
}

fn exchange() -> (Exchange, RecordingGateway) {
    let gateway = RecordingGateway::new();
    let config = ExchangeConfig::new(SECURITY, CURRENCY, OPERATOR, AGENT);
    (Exchange::new(config, Box::new(gateway.clone())), gateway)
}

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

#[test]
fn exact_match_fills_both_orders() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(5))
        .unwrap();
    let buy = ex
        .new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();

    let posted = gateway.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].price, dec(100));
    assert_eq!(posted[0].quantity, dec(5));
    assert_eq!(ex.order(OPERATOR, sell).unwrap().status, OrderStatus::Filled);
    assert_eq!(ex.order(OPERATOR, buy).unwrap().status, OrderStatus::Filled);
    assert!(ex.book().is_unindexed(sell));
    assert!(ex.book().is_unindexed(buy));
}

#[test]
fn partial_fill_then_rest() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(10))
        .unwrap();
    ex.new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(4))
        .unwrap();

    assert_eq!(gateway.posted()[0].quantity, dec(4));
    let resting = ex.order(OPERATOR, sell).unwrap();
    assert_eq!(resting.status, OrderStatus::PartiallyFilled);
    assert_eq!(resting.quantity, dec(6));
    assert!(ex.book().sub_book(OrderKind::Limit).contains(sell));
}

#[test]
fn price_priority_best_offer_fills_first() {
    init_log();
    let (mut ex, gateway) = exchange();
    ex.new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(10)), dec(5))
        .unwrap();
    ex.new_order(PartyId(2), Side::Sell, OrderKind::Limit, Some(dec(12)), dec(5))
        .unwrap();
    ex.new_order(PartyId(3), Side::Sell, OrderKind::Limit, Some(dec(9)), dec(5))
        .unwrap();
    ex.new_order(PartyId(4), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();

    let posted = gateway.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].price, dec(9), "lowest offer fills first");
    assert_eq!(posted[0].maker_party, PartyId(3));
}

#[test]
fn stop_trigger_cascade_matches_in_same_submission() {
    init_log();
    let (mut ex, gateway) = exchange();
    // Resting bid and a protective sell stop above the coming clearing price.
    ex.new_order(PartyId(1), Side::Buy, OrderKind::Limit, Some(dec(94)), dec(10))
        .unwrap();
    let stop = ex
        .new_order(PartyId(2), Side::Sell, OrderKind::Stop, Some(dec(95)), dec(5))
        .unwrap();
    assert!(ex.book().sub_book(OrderKind::Stop).contains(stop));
    assert!(gateway.posted().is_empty(), "stop must not fill before trigger");

    // A market sell clears at 94, below the stop trigger of 95.
    ex.new_order(PartyId(3), Side::Sell, OrderKind::Market, None, dec(2))
        .unwrap();

    let posted = gateway.posted();
    assert_eq!(posted.len(), 2, "stop promotes and matches in the same submission");
    assert_eq!(posted[0].price, dec(94));
    assert_eq!(posted[0].quantity, dec(2));
    assert_eq!(posted[1].quantity, dec(5));
    assert_eq!(posted[1].price, dec(94));
    let stop_order = ex.order(OPERATOR, stop).unwrap();
    assert_eq!(stop_order.status, OrderStatus::Filled);
    assert_eq!(stop_order.kind, OrderKind::Market, "triggered stop became a market order");
}

#[test]
fn rejected_settlement_restores_both_orders() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(3))
        .unwrap();
    let buy = ex
        .new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(3))
        .unwrap();
    let trade_id = gateway.posted()[0].trade_id;

    ex.reject_trade(AGENT, trade_id).unwrap();

    for (reference, kind) in [(sell, OrderKind::Limit), (buy, OrderKind::Market)] {
        let order = ex.order(OPERATOR, reference).unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.quantity, dec(3), "exactly the traded quantity is restored");
        assert!(ex.book().sub_book(kind).contains(reference), "back in its sub-book");
    }
    // The rejected trade is terminal; rejecting again is an error.
    assert!(matches!(
        ex.reject_trade(AGENT, trade_id),
        Err(EngineError::InvalidState(_))
    ));
}

#[test]
fn confirmed_settlement_retires_trade_and_orders() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(5))
        .unwrap();
    ex.new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();
    let trade_id = gateway.posted()[0].trade_id;

    ex.confirm_trade(AGENT, trade_id).unwrap();
    assert_eq!(ex.pending_trades(), 0);
    assert!(matches!(
        ex.order(OPERATOR, sell),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn reversal_by_order_leg_restores_the_pending_trade_once() {
    init_log();
    let (mut ex, gateway) = exchange();
    // Sell 10 fills in two trades of 5; the first settles, the second stays
    // Pending.
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(10))
        .unwrap();
    ex.new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();
    let buy2 = ex
        .new_order(PartyId(3), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();
    ex.confirm_trade(AGENT, gateway.posted()[0].trade_id).unwrap();

    // The reversal resolves the Pending trade recording this leg and rejects
    // it as a whole: both legs come back, but only the pending debit.
    ex.revert_trade(AGENT, sell, dec(5)).unwrap();
    let seller = ex.order(OPERATOR, sell).unwrap();
    assert_eq!(seller.status, OrderStatus::Open);
    assert_eq!(seller.quantity, dec(5), "the settled quantity stays settled");
    assert_eq!(ex.order(OPERATOR, buy2).unwrap().quantity, dec(5));

    // Repeating the reversal finds the trade terminal and changes nothing.
    assert!(matches!(
        ex.revert_trade(AGENT, sell, dec(5)),
        Err(EngineError::InvalidState(_))
    ));
    assert_eq!(ex.order(OPERATOR, sell).unwrap().quantity, dec(5));
    // A debit no trade recorded is unknown.
    assert!(matches!(
        ex.revert_trade(AGENT, sell, dec(3)),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn cancellation_is_idempotent_via_not_found() {
    init_log();
    let (mut ex, _) = exchange();
    let r = ex
        .new_order(PartyId(1), Side::Buy, OrderKind::Limit, Some(dec(90)), dec(5))
        .unwrap();
    ex.cancel_order(PartyId(1), r).unwrap();
    assert!(matches!(
        ex.cancel_order(PartyId(1), r),
        Err(EngineError::NotFound(_))
    ));
    assert!(ex.book().is_unindexed(r));
}

#[test]
fn same_party_never_trades_with_itself() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(5))
        .unwrap();
    let buy = ex
        .new_order(PartyId(1), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();
    assert!(gateway.posted().is_empty());
    assert_eq!(ex.order(PartyId(1), sell).unwrap().status, OrderStatus::Open);
    assert_eq!(ex.order(PartyId(1), buy).unwrap().status, OrderStatus::Open);
}

#[test]
fn swap_adapter_exact_in_buy_spends_currency() {
    init_log();
    let (mut ex, gateway) = exchange();
    ex.new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(10))
        .unwrap();
    // Buyer offers exactly 300 currency units at the going price of 100.
    let out = ex
        .submit_swap(SwapRequest {
            party: PartyId(2),
            token_in: CURRENCY,
            token_out: SECURITY,
            amount: dec(300),
            direction: SwapDirection::ExactIn,
            price: None,
            stop: false,
        })
        .unwrap();
    assert_eq!(out.filled, dec(3), "300 currency buys 3 security at 100");
    assert_eq!(out.price, Some(dec(100)));
    assert_eq!(gateway.posted()[0].quantity, dec(3));
    assert!(
        matches!(ex.order(PartyId(2), out.reference), Ok(o) if o.status == OrderStatus::Filled)
    );
}

#[test]
fn sell_limit_fills_resting_market_buy_at_its_own_price() {
    init_log();
    let (mut ex, gateway) = exchange();
    // A buy market order rests with no liquidity to take.
    let resting_buy = ex
        .new_order(PartyId(1), Side::Buy, OrderKind::Market, None, dec(5))
        .unwrap();
    assert!(gateway.posted().is_empty());
    // An incoming sell limit prices the pair: the resting market order
    // carries no price, so the fill executes at the incoming limit.
    let sell = ex
        .new_order(PartyId(2), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(5))
        .unwrap();

    let posted = gateway.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].price, dec(100));
    assert_eq!(posted[0].quantity, dec(5));
    assert_eq!(ex.order(OPERATOR, sell).unwrap().status, OrderStatus::Filled);
    assert_eq!(
        ex.order(OPERATOR, resting_buy).unwrap().status,
        OrderStatus::Filled
    );
}

#[test]
fn eligible_limit_is_promoted_into_the_market_sub_book() {
    init_log();
    let (mut ex, gateway) = exchange();
    ex.new_order(PartyId(1), Side::Buy, OrderKind::Limit, Some(dec(101)), dec(1))
        .unwrap();
    // The sell fills 1 at 101; the clearing price (101 >= 100) then makes the
    // residual eligible, so the scanner moves it into the Market sub-book.
    let sell = ex
        .new_order(PartyId(2), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(5))
        .unwrap();

    assert_eq!(gateway.posted().len(), 1);
    assert_eq!(gateway.posted()[0].price, dec(101));
    let residual = ex.order(OPERATOR, sell).unwrap();
    assert_eq!(residual.status, OrderStatus::PartiallyFilled);
    assert_eq!(residual.quantity, dec(4));
    assert!(ex.book().sub_book(OrderKind::Market).contains(sell));
    assert!(!ex.book().sub_book(OrderKind::Limit).contains(sell));
}

#[test]
fn quantity_conservation_across_partial_fills() {
    init_log();
    let (mut ex, gateway) = exchange();
    let sell = ex
        .new_order(PartyId(1), Side::Sell, OrderKind::Limit, Some(dec(100)), dec(10))
        .unwrap();
    let buy = ex
        .new_order(PartyId(2), Side::Buy, OrderKind::Market, None, dec(7))
        .unwrap();

    let traded: Decimal = gateway.posted().iter().map(|t| t.quantity).sum();
    let sell_filled = dec(10) - ex.order(OPERATOR, sell).unwrap().quantity;
    let buy_filled = dec(7) - ex.order(OPERATOR, buy).unwrap().quantity;
    assert_eq!(sell_filled, traded);
    assert_eq!(buy_filled, traded);
}
