//! # Token Market Engine
//!
//! Order-matching and two-phase trade-settlement engine for one tokenized
//! security traded against one currency token. Supports market, limit, and
//! stop orders with price-time priority, partial fills, trigger cascades, and
//! a settlement bridge (Pending → Confirmed | Rejected with compensating
//! reversal).
//!
//! ## Entry point
//!
//! Use [`Exchange`] as the single entry point: create with [`Exchange::new`],
//! submit with [`Exchange::new_order`] or [`Exchange::submit_swap`], and let
//! the settlement collaborator drive [`Exchange::confirm_trade`] /
//! [`Exchange::reject_trade`].
//!
//! ## Example
//!
//! ```rust
//! use token_market_engine::{
//!     Exchange, ExchangeConfig, OrderKind, PartyId, RecordingGateway, Side, TokenId,
//! };
//! use rust_decimal::Decimal;
//!
//! let config = ExchangeConfig::new(TokenId(1), TokenId(2), PartyId(900), PartyId(901));
//! let mut exchange = Exchange::new(config, Box::new(RecordingGateway::new()));
//!
//! let seller = PartyId(1);
//! exchange
//!     .new_order(seller, Side::Sell, OrderKind::Limit, Some(Decimal::from(100)), Decimal::from(5))
//!     .unwrap();
//! let buyer = PartyId(2);
//! exchange
//!     .new_order(buyer, Side::Buy, OrderKind::Market, None, Decimal::from(5))
//!     .unwrap();
//!
//! assert_eq!(exchange.pending_trades(), 1);
//! assert_eq!(exchange.last_price(), Some(Decimal::from(100)));
//! ```
//!
//! ## Lower-level API
//!
//! You can also use [`OrderStore`], [`OrderBook`], and [`match_order`]
//! directly if you manage the cascade and settlement reporting yourself.

pub mod book;
pub mod engine;
pub mod error;
pub mod flow;
pub mod matching;
pub mod settlement;
pub mod store;
pub mod trigger;
pub mod types;
pub mod vault;

pub use book::{OrderBook, SubBook};
pub use engine::{Exchange, ExchangeConfig, SwapOutcome, SwapRequest, DEFAULT_MAX_FILLS};
pub use error::{EngineError, Result};
pub use flow::{replay, FlowConfig, FlowGenerator, Submission};
pub use matching::{match_order, Fill};
pub use settlement::{
    RecordingGateway, SettlementBridge, SettlementGateway, StdoutGateway, Trade, TradeTerms,
};
pub use store::{NewOrder, OrderStore};
pub use types::{
    Order, OrderKind, OrderRef, OrderStatus, PartyId, SettlementStatus, Side, SwapDirection,
    TokenId, TradeId,
};
pub use vault::{CustodyVault, InMemoryVault};
