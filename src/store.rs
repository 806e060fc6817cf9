//! Order store: owns every order record by reference, independent of book
//! membership.
//!
//! References are derived deterministically from `(party, submission counter)`;
//! a would-be collision bumps the counter until the reference is free. The
//! store validates new orders before any mutation and is the single owner of
//! [`Order`] state — the matching engine and settlement bridge borrow mutable
//! access through [`OrderStore::get_mut`].

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;

use crate::error::{EngineError, Result};
use crate::types::{Order, OrderKind, OrderRef, OrderStatus, PartyId, Side, SwapDirection, TokenId};

/// Parameters for a new order. `price` must be zero for market orders and
/// positive for limit/stop orders; `quantity` must be positive.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub party: PartyId,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity: Decimal,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub direction: SwapDirection,
}

/// Arena of order records keyed by reference.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<OrderRef, Order>,
}

fn derive_reference(party: PartyId, stamp: u64) -> OrderRef {
    let mut hasher = DefaultHasher::new();
    party.0.hash(&mut hasher);
    stamp.hash(&mut hasher);
    OrderRef(hasher.finish())
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an order record and returns its reference. `stamp` is the
    /// engine's monotonic submission counter; if two orders would share a
    /// reference the stamp is bumped until the reference is free. Returns the
    /// stamp actually used so the caller can keep its counter ahead of it.
    pub fn create(&mut self, params: NewOrder, stamp: u64) -> Result<(OrderRef, u64)> {
        if params.quantity <= Decimal::ZERO {
            return Err(EngineError::Validation("order quantity must be positive".into()));
        }
        match params.kind {
            OrderKind::Market => {
                if params.price != Decimal::ZERO {
                    return Err(EngineError::Validation(
                        "market order carries no price".into(),
                    ));
                }
            }
            OrderKind::Limit | OrderKind::Stop => {
                if params.price <= Decimal::ZERO {
                    return Err(EngineError::Validation(
                        "limit/stop order price must be positive".into(),
                    ));
                }
            }
        }
        if params.token_in == params.token_out {
            return Err(EngineError::Validation(
                "order must exchange two distinct tokens".into(),
            ));
        }

        let mut stamp = stamp;
        let mut reference = derive_reference(params.party, stamp);
        while self.orders.contains_key(&reference) {
            stamp += 1;
            reference = derive_reference(params.party, stamp);
        }

        let order = Order {
            reference,
            side: params.side,
            kind: params.kind,
            status: OrderStatus::Open,
            price: params.price,
            quantity: params.quantity,
            party: params.party,
            token_in: params.token_in,
            token_out: params.token_out,
            direction: params.direction,
            timestamp: stamp,
        };
        self.orders.insert(reference, order);
        Ok((reference, stamp))
    }

    /// Looks up an order. `NotFound` if absent or previously removed.
    pub fn get(&self, reference: OrderRef) -> Result<&Order> {
        self.orders
            .get(&reference)
            .ok_or_else(|| EngineError::NotFound(format!("order {}", reference.0)))
    }

    /// Mutable lookup for engine-internal transitions (matching, trigger
    /// promotion, settlement reversal). Owner-facing edits go through the
    /// exchange facade, which enforces ownership and lifecycle state.
    pub(crate) fn get_mut(&mut self, reference: OrderRef) -> Result<&mut Order> {
        self.orders
            .get_mut(&reference)
            .ok_or_else(|| EngineError::NotFound(format!("order {}", reference.0)))
    }

    /// True if the reference is present.
    pub fn contains(&self, reference: OrderRef) -> bool {
        self.orders.contains_key(&reference)
    }

    /// Deletes an order record, returning it. The caller is responsible for
    /// purging the reference from every sub-book in the same step (the
    /// exchange facade pairs this with `OrderBook::remove_everywhere`).
    pub(crate) fn remove(&mut self, reference: OrderRef) -> Result<Order> {
        self.orders
            .remove(&reference)
            .ok_or_else(|| EngineError::NotFound(format!("order {}", reference.0)))
    }

    /// References of all orders owned by `party`, oldest first.
    pub fn party_orders(&self, party: PartyId) -> Vec<OrderRef> {
        let mut refs: Vec<&Order> = self.orders.values().filter(|o| o.party == party).collect();
        refs.sort_by_key(|o| o.timestamp);
        refs.iter().map(|o| o.reference).collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
