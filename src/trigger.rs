//! Trigger scanner: re-evaluates resting limit and stop orders whenever the
//! clearing price moves.
//!
//! Limits capture favorable moves: a buy limit is eligible once the clearing
//! price falls to or below its limit, a sell limit once it rises to or above.
//! Stops protect against adverse moves with the inverted condition: a buy
//! stop triggers at or above its price, a sell stop at or below. Eligible
//! orders are promoted into the Market sub-book (a stop is rewritten into a
//! market order) and re-matched by the caller in the same submission.

use rust_decimal::Decimal;

use crate::book::OrderBook;
use crate::error::Result;
use crate::store::OrderStore;
use crate::types::{OrderKind, OrderRef, Side};

fn limit_eligible(side: Side, limit: Decimal, clearing: Decimal) -> bool {
    match side {
        Side::Buy => clearing <= limit,
        Side::Sell => clearing >= limit,
    }
}

fn stop_eligible(side: Side, trigger: Decimal, clearing: Decimal) -> bool {
    match side {
        Side::Buy => clearing >= trigger,
        Side::Sell => clearing <= trigger,
    }
}

/// References of resting limit/stop orders whose condition is met by
/// `clearing`, in insertion order (limits first).
pub fn eligible_orders(
    store: &OrderStore,
    book: &OrderBook,
    clearing: Decimal,
) -> Result<Vec<OrderRef>> {
    let mut eligible = Vec::new();
    for &reference in book.sub_book(OrderKind::Limit).refs() {
        let order = store.get(reference)?;
        if order.status.is_active() && limit_eligible(order.side, order.price, clearing) {
            eligible.push(reference);
        }
    }
    for &reference in book.sub_book(OrderKind::Stop).refs() {
        let order = store.get(reference)?;
        if order.status.is_active() && stop_eligible(order.side, order.price, clearing) {
            eligible.push(reference);
        }
    }
    Ok(eligible)
}

/// Moves an eligible order into the Market sub-book. A stop order becomes a
/// market order (kind Market, price 0); a limit keeps its kind and price, so
/// the crossing condition still enforces its limit.
pub fn promote(store: &mut OrderStore, book: &mut OrderBook, reference: OrderRef) -> Result<()> {
    let order = store.get_mut(reference)?;
    if order.kind == OrderKind::Stop {
        order.kind = OrderKind::Market;
        order.price = Decimal::ZERO;
        log::info!("stop triggered order={} now market", reference.0);
    } else {
        log::info!("limit promoted order={} price={}", reference.0, order.price);
    }
    book.promote_to_market(reference);
    Ok(())
}
