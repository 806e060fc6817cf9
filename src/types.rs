//! Core types and IDs for the exchange (order entity and its closed enums).
//!
//! All identifiers are newtype wrappers. [`Order`], [`Side`], [`OrderKind`],
//! [`OrderStatus`], and [`SwapDirection`] define the order entity and its
//! lifecycle. Prices and quantities are [`rust_decimal::Decimal`]; a price of
//! zero on a market order means "accept the best available counter-price".

use rust_decimal::Decimal;

/// Unique order reference, derived from `(party, submission counter)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrderRef(pub u64);

/// Trade identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TradeId(pub u64);

/// Party (account/address) identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PartyId(pub u64);

/// Token identifier (security or currency leg of the pair).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TokenId(pub u64);

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order kind: market (take best available), limit (at price or better), or
/// stop (becomes a market order once its trigger price is reached).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

/// Order lifecycle status.
///
/// Transitions: Open → {PartiallyFilled, Filled, Cancelled};
/// PartiallyFilled → {PartiallyFilled, Filled}. Filled and Cancelled are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// True while the order may still fill (and may be indexed by a sub-book).
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

/// Swap convention the adapter received: whether `quantity` is denominated in
/// the token the party pays in (`ExactIn`) or the token it receives (`ExactOut`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SwapDirection {
    ExactIn,
    ExactOut,
}

/// Settlement state of a reported trade. Pending until the settlement
/// collaborator confirms or rejects; both outcomes are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// Order entity.
///
/// `price` is zero for market orders. `quantity` is the remaining unfilled
/// amount, denominated per `direction` (see [`Order::quantity_in_security`]);
/// the plain submission interface always denominates in security units.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub reference: OrderRef,
    pub side: Side,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub price: Decimal,
    pub quantity: Decimal,
    pub party: PartyId,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub direction: SwapDirection,
    /// Monotonic submission counter; tie-breaker for price-time priority.
    pub timestamp: u64,
}

impl Order {
    pub fn is_market(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }

    /// True when `quantity` is denominated in security-token units.
    ///
    /// A buyer receives the security (`ExactOut` ⇒ security units); a seller
    /// pays in the security (`ExactIn` ⇒ security units).
    pub fn quantity_in_security(&self) -> bool {
        matches!(
            (self.side, self.direction),
            (Side::Buy, SwapDirection::ExactOut) | (Side::Sell, SwapDirection::ExactIn)
        )
    }

    /// Remaining quantity expressed in security units at the given execution
    /// price. Currency-denominated remainders are converted by division.
    pub fn remaining_security(&self, price: Decimal) -> Decimal {
        if self.quantity_in_security() {
            self.quantity
        } else if price > Decimal::ZERO {
            self.quantity / price
        } else {
            Decimal::ZERO
        }
    }
}
