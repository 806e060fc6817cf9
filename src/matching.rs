//! Price-time priority matching.
//!
//! [`match_order`] runs one order against the opposite side of the book:
//! selects the best-priced crossing counter (earliest timestamp on ties),
//! fills `min` of the two remainders in security-token units, executes at the
//! resting order's price, and repeats until the order is filled, no counter
//! crosses, or the fill budget is exhausted (fail closed, remainder rests).

use rust_decimal::Decimal;

use crate::book::OrderBook;
use crate::error::{EngineError, Result};
use crate::store::OrderStore;
use crate::types::{Order, OrderKind, OrderRef, OrderStatus, PartyId, Side};

/// One fill between a resting (maker) order and the aggressing (taker) order.
///
/// `quantity` is in security-token units; `maker_debit` / `taker_debit` are
/// the exact amounts subtracted from each order's `quantity` field in its own
/// denomination, recorded so settlement rejection can restore them precisely.
#[derive(Clone, Debug)]
pub struct Fill {
    pub maker: OrderRef,
    pub taker: OrderRef,
    pub maker_party: PartyId,
    pub taker_party: PartyId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub maker_debit: Decimal,
    pub taker_debit: Decimal,
    pub maker_filled: bool,
    pub taker_filled: bool,
}

/// Execution price for a maker/taker pairing: the resting order's price, the
/// taker's price when the maker is a resting market order, or the last
/// clearing price when both are market orders. `None` means the pair cannot
/// be priced yet (no reference price exists) and must not match.
fn execution_price(maker: &Order, taker: &Order, last_price: Option<Decimal>) -> Option<Decimal> {
    if maker.price > Decimal::ZERO {
        Some(maker.price)
    } else if taker.price > Decimal::ZERO {
        Some(taker.price)
    } else {
        last_price
    }
}

/// Crossing condition: does the taker accept `price`? (The maker side is
/// satisfied by construction since `price` is the maker's own price whenever
/// the maker carries one.)
fn taker_accepts(taker: &Order, price: Decimal) -> bool {
    if taker.price == Decimal::ZERO {
        return true;
    }
    match taker.side {
        Side::Buy => taker.price >= price,
        Side::Sell => taker.price <= price,
    }
}

/// True if `candidate` beats `best` for the taker: buyers want the lowest
/// price, sellers the highest; ties go to the earlier timestamp.
fn better_for_taker(side: Side, candidate: (Decimal, u64), best: (Decimal, u64)) -> bool {
    let (cand_px, cand_ts) = candidate;
    let (best_px, best_ts) = best;
    if cand_px == best_px {
        return cand_ts < best_ts;
    }
    match side {
        Side::Buy => cand_px < best_px,
        Side::Sell => cand_px > best_px,
    }
}

/// Selects the best crossing counter-order for the taker from the Market and
/// Limit sub-books. Stop orders never match until promoted.
fn best_counter(
    store: &OrderStore,
    book: &OrderBook,
    taker: &Order,
    last_price: Option<Decimal>,
) -> Result<Option<(OrderRef, Decimal)>> {
    let mut best: Option<(OrderRef, Decimal, u64)> = None;
    let candidates = book
        .sub_book(OrderKind::Market)
        .refs()
        .iter()
        .chain(book.sub_book(OrderKind::Limit).refs().iter());
    for &candidate in candidates {
        if candidate == taker.reference {
            continue;
        }
        let order = store.get(candidate).map_err(|_| {
            EngineError::Consistency(format!("sub-book indexes unknown order {}", candidate.0))
        })?;
        if order.side != taker.side.opposite()
            || order.party == taker.party
            || !order.status.is_active()
        {
            continue;
        }
        let Some(price) = execution_price(order, taker, last_price) else {
            continue;
        };
        if !taker_accepts(taker, price) {
            continue;
        }
        match best {
            Some((_, best_px, best_ts))
                if !better_for_taker(taker.side, (price, order.timestamp), (best_px, best_ts)) => {}
            _ => best = Some((candidate, price, order.timestamp)),
        }
    }
    Ok(best.map(|(r, px, _)| (r, px)))
}

/// Decrements one leg of a fill and advances its status. `constraining` marks
/// the side whose remainder equals the fill quantity: that side is zeroed
/// directly so currency-unit division round-off cannot strand dust.
fn apply_fill(
    store: &mut OrderStore,
    book: &mut OrderBook,
    reference: OrderRef,
    quantity: Decimal,
    price: Decimal,
    constraining: bool,
) -> Result<(Decimal, bool)> {
    let order = store.get_mut(reference)?;
    let debit = if constraining {
        order.quantity
    } else if order.quantity_in_security() {
        quantity
    } else {
        quantity * price
    };
    if debit > order.quantity {
        debug_assert!(false, "fill debit exceeds remaining quantity");
        return Err(EngineError::Consistency(format!(
            "fill debit {} exceeds remaining quantity {} on order {}",
            debit, order.quantity, reference.0
        )));
    }
    order.quantity -= debit;
    let filled = order.quantity == Decimal::ZERO;
    order.status = if filled {
        OrderStatus::Filled
    } else {
        OrderStatus::PartiallyFilled
    };
    if filled {
        book.remove_everywhere(reference);
    }
    Ok((debit, filled))
}

/// Runs matching for one order until it fills, no counter crosses, or
/// `budget` reaches zero. Returns the fills produced; the caller reports each
/// as a trade and feeds the new clearing price to the trigger scanner.
pub fn match_order(
    store: &mut OrderStore,
    book: &mut OrderBook,
    taker_ref: OrderRef,
    mut last_price: Option<Decimal>,
    budget: &mut usize,
) -> Result<Vec<Fill>> {
    let mut fills = Vec::new();
    loop {
        if *budget == 0 {
            break;
        }
        let taker = store.get(taker_ref)?.clone();
        // Stops only participate after trigger promotion rewrites them.
        if !taker.status.is_active() || taker.kind == OrderKind::Stop {
            break;
        }
        let Some((maker_ref, price)) = best_counter(store, book, &taker, last_price)? else {
            break;
        };
        let maker = store.get(maker_ref)?.clone();

        let taker_remaining = taker.remaining_security(price);
        let maker_remaining = maker.remaining_security(price);
        let quantity = taker_remaining.min(maker_remaining);
        if quantity <= Decimal::ZERO {
            return Err(EngineError::Consistency(format!(
                "non-positive fill quantity between {} and {}",
                taker_ref.0, maker_ref.0
            )));
        }

        let (maker_debit, maker_filled) = apply_fill(
            store,
            book,
            maker_ref,
            quantity,
            price,
            maker_remaining == quantity,
        )?;
        let (taker_debit, taker_filled) = apply_fill(
            store,
            book,
            taker_ref,
            quantity,
            price,
            taker_remaining == quantity,
        )?;

        log::info!(
            "fill maker={} taker={} price={} quantity={}",
            maker_ref.0,
            taker_ref.0,
            price,
            quantity
        );
        fills.push(Fill {
            maker: maker_ref,
            taker: taker_ref,
            maker_party: maker.party,
            taker_party: taker.party,
            price,
            quantity,
            maker_debit,
            taker_debit,
            maker_filled,
            taker_filled,
        });
        last_price = Some(price);
        *budget -= 1;
        if taker_filled {
            break;
        }
    }
    Ok(fills)
}
