//! Single-entry exchange facade for one security/currency trading pair.
//!
//! [`Exchange`] owns the order store, the three sub-books, and the settlement
//! bridge, and drives the matching/trigger cascade as one logical critical
//! section per submission. Hosts wanting cross-thread access wrap one
//! instance per trading pair in a mutex; distinct pairs are independent.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::book::OrderBook;
use crate::error::{EngineError, Result};
use crate::matching::{match_order, Fill};
use crate::settlement::{SettlementBridge, SettlementGateway, Trade};
use crate::store::{NewOrder, OrderStore};
use crate::trigger;
use crate::types::{
    Order, OrderKind, OrderRef, OrderStatus, PartyId, Side, SwapDirection, TokenId, TradeId,
};
use crate::vault::CustodyVault;

/// Default bound on fills per submission (matching plus trigger cascades).
pub const DEFAULT_MAX_FILLS: usize = 64;

/// Static configuration for one exchange instance.
#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    pub security: TokenId,
    pub currency: TokenId,
    /// Host identity allowed to read any party's orders.
    pub operator: PartyId,
    /// The only identity allowed to confirm/reject/revert trades.
    pub settlement_agent: PartyId,
    /// Fill budget per submission; when exhausted, matching stops and the
    /// remainder rests (fail closed).
    pub max_fills_per_submission: usize,
}

impl ExchangeConfig {
    pub fn new(
        security: TokenId,
        currency: TokenId,
        operator: PartyId,
        settlement_agent: PartyId,
    ) -> Self {
        Self {
            security,
            currency,
            operator,
            settlement_agent,
            max_fills_per_submission: DEFAULT_MAX_FILLS,
        }
    }
}

/// Incoming swap request: an exchange of security vs currency at an implied
/// or explicit price. The side is decided by which token is offered; the kind
/// by whether a price was supplied and whether `stop` is set.
#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub party: PartyId,
    pub token_in: TokenId,
    pub token_out: TokenId,
    /// Amount in `token_in` units for `ExactIn`, `token_out` units for `ExactOut`.
    pub amount: Decimal,
    pub direction: SwapDirection,
    /// Absent ⇒ market order at the best available counter-price.
    pub price: Option<Decimal>,
    /// With `price`, request a stop order instead of a limit order.
    pub stop: bool,
}

/// Result of a swap submission: the immediately filled security quantity
/// (zero when the order rests) and the last clearing price it filled at.
#[derive(Clone, Debug)]
pub struct SwapOutcome {
    pub reference: OrderRef,
    pub filled: Decimal,
    pub price: Option<Decimal>,
}

/// Matching and settlement engine for one trading pair.
pub struct Exchange {
    config: ExchangeConfig,
    store: OrderStore,
    book: OrderBook,
    bridge: SettlementBridge,
    vault: Option<Box<dyn CustodyVault>>,
    last_price: Option<Decimal>,
    clock: u64,
}

impl Exchange {
    pub fn new(config: ExchangeConfig, gateway: Box<dyn SettlementGateway>) -> Self {
        let bridge = SettlementBridge::new(config.settlement_agent, gateway);
        Self {
            config,
            store: OrderStore::new(),
            book: OrderBook::new(),
            bridge,
            vault: None,
            last_price: None,
            clock: 0,
        }
    }

    /// Attaches a custody vault for the best-effort balance check on
    /// submission. Without one, submissions are accepted unchecked.
    pub fn set_vault(&mut self, vault: Box<dyn CustodyVault>) {
        self.vault = Some(vault);
    }

    /// Last clearing price, if any trade has executed.
    pub fn last_price(&self) -> Option<Decimal> {
        self.last_price
    }

    /// Read access to the sub-books (membership checks, depth).
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn pending_trades(&self) -> usize {
        self.bridge.pending_count()
    }

    pub fn trade(&self, trade_id: TradeId) -> Result<Trade> {
        self.bridge.get(trade_id).cloned()
    }

    // ---- submission interface ----

    /// Submits an order with quantity in security-token units. Runs matching
    /// (and any trigger cascade) before returning. `price` must be absent for
    /// market orders and present for limit/stop orders.
    pub fn new_order(
        &mut self,
        party: PartyId,
        side: Side,
        kind: OrderKind,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Result<OrderRef> {
        let price = match (kind, price) {
            (OrderKind::Market, None) => Decimal::ZERO,
            (OrderKind::Market, Some(_)) => {
                return Err(EngineError::Validation("market order carries no price".into()))
            }
            (_, Some(p)) => p,
            (_, None) => {
                return Err(EngineError::Validation(
                    "limit/stop order requires a price".into(),
                ))
            }
        };
        let (token_in, token_out, direction) = match side {
            Side::Buy => (self.config.currency, self.config.security, SwapDirection::ExactOut),
            Side::Sell => (self.config.security, self.config.currency, SwapDirection::ExactIn),
        };
        let params = NewOrder {
            party,
            side,
            kind,
            price,
            quantity,
            token_in,
            token_out,
            direction,
        };
        let (reference, _) = self.submit(params)?;
        Ok(reference)
    }

    /// Swap adapter: decides side from the offered token and kind from the
    /// price/stop flags, then submits. Rejects malformed requests before any
    /// state mutation.
    pub fn submit_swap(&mut self, request: SwapRequest) -> Result<SwapOutcome> {
        let pair = (self.config.security, self.config.currency);
        let side = if (request.token_in, request.token_out) == (pair.1, pair.0) {
            Side::Buy
        } else if (request.token_in, request.token_out) == (pair.0, pair.1) {
            Side::Sell
        } else {
            return Err(EngineError::Validation(
                "swap tokens do not match the trading pair".into(),
            ));
        };
        let kind = match (request.price, request.stop) {
            (None, false) => OrderKind::Market,
            (Some(_), false) => OrderKind::Limit,
            (Some(_), true) => OrderKind::Stop,
            (None, true) => {
                return Err(EngineError::Validation(
                    "stop order requires a trigger price".into(),
                ))
            }
        };
        let params = NewOrder {
            party: request.party,
            side,
            kind,
            price: request.price.unwrap_or(Decimal::ZERO),
            quantity: request.amount,
            token_in: request.token_in,
            token_out: request.token_out,
            direction: request.direction,
        };
        let (reference, fills) = self.submit(params)?;
        let own: Vec<&Fill> = fills
            .iter()
            .filter(|f| f.maker == reference || f.taker == reference)
            .collect();
        let filled = own.iter().map(|f| f.quantity).sum();
        let price = own.last().map(|f| f.price);
        Ok(SwapOutcome {
            reference,
            filled,
            price,
        })
    }

    /// Edits a resting limit/stop order's price and quantity. Owner only,
    /// Open only. The edit re-triggers matching for the order.
    pub fn edit_order(
        &mut self,
        party: PartyId,
        reference: OrderRef,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<()> {
        {
            let order = self.store.get(reference)?;
            if order.party != party {
                return Err(EngineError::Unauthorized(format!(
                    "party {} does not own order {}",
                    party.0, reference.0
                )));
            }
            if order.kind == OrderKind::Market {
                return Err(EngineError::InvalidState(
                    "market order price is immutable".into(),
                ));
            }
            if order.status != OrderStatus::Open {
                return Err(EngineError::InvalidState(format!(
                    "order {} is {:?}, only Open orders can be edited",
                    reference.0, order.status
                )));
            }
        }
        if price <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "limit/stop order price must be positive".into(),
            ));
        }
        if quantity <= Decimal::ZERO {
            return Err(EngineError::Validation("order quantity must be positive".into()));
        }
        {
            let order = self.store.get_mut(reference)?;
            order.price = price;
            order.quantity = quantity;
        }
        log::info!(
            "order edited order={} price={} quantity={}",
            reference.0,
            price,
            quantity
        );
        self.run_cascade(reference)?;
        Ok(())
    }

    /// Cancels an Open order. Owner only. Deletes the record and purges every
    /// sub-book index; a second cancel of the same reference is `NotFound`.
    pub fn cancel_order(&mut self, party: PartyId, reference: OrderRef) -> Result<()> {
        {
            let order = self.store.get(reference)?;
            if order.party != party {
                return Err(EngineError::Unauthorized(format!(
                    "party {} does not own order {}",
                    party.0, reference.0
                )));
            }
            if order.status != OrderStatus::Open {
                return Err(EngineError::InvalidState(format!(
                    "order {} is {:?}, only Open orders can be cancelled",
                    reference.0, order.status
                )));
            }
        }
        self.store.remove(reference)?;
        self.book.remove_everywhere(reference);
        log::info!("order cancelled order={}", reference.0);
        Ok(())
    }

    /// Returns an order. Owner or operator only.
    pub fn order(&self, caller: PartyId, reference: OrderRef) -> Result<Order> {
        let order = self.store.get(reference)?;
        if caller != order.party && caller != self.config.operator {
            return Err(EngineError::Unauthorized(format!(
                "party {} may not read order {}",
                caller.0, reference.0
            )));
        }
        Ok(order.clone())
    }

    /// References of the caller's own orders, oldest first.
    pub fn party_orders(&self, party: PartyId) -> Vec<OrderRef> {
        self.store.party_orders(party)
    }

    // ---- settlement callbacks (agent only) ----

    /// Confirms a Pending trade: finalizes both legs, deleting an order only
    /// when it is Filled with no other Pending trade referencing it.
    pub fn confirm_trade(&mut self, caller: PartyId, trade_id: TradeId) -> Result<()> {
        let trade = self.bridge.confirm(caller, trade_id)?;
        self.retire_leg(trade.maker_ref);
        self.retire_leg(trade.taker_ref);
        Ok(())
    }

    /// Rejects a Pending trade: compensating reversal restores each leg's
    /// exact debit, resets status to Open, and re-inserts into the sub-book
    /// for the order's kind. Legs whose orders were retired by unrelated
    /// confirmed trades are skipped, never resurrected.
    pub fn reject_trade(&mut self, caller: PartyId, trade_id: TradeId) -> Result<()> {
        let trade = self.bridge.reject(caller, trade_id)?;
        self.revert_leg(trade.maker_ref, trade.maker_debit);
        self.revert_leg(trade.taker_ref, trade.taker_debit);
        Ok(())
    }

    /// Collaborator-facing reversal keyed by order leg: resolves the Pending
    /// trade whose recorded debit matches `(reference, quantity)` and runs
    /// the full rejection for it. Reversal is always per-trade; a repeat
    /// call finds the trade already terminal and fails without mutating.
    /// Agent only.
    pub fn revert_trade(
        &mut self,
        caller: PartyId,
        reference: OrderRef,
        quantity: Decimal,
    ) -> Result<()> {
        self.bridge.authorize_agent(caller)?;
        if quantity <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "reversal quantity must be positive".into(),
            ));
        }
        let trade_id = self.bridge.pending_leg(reference, quantity)?;
        self.reject_trade(caller, trade_id)
    }

    fn retire_leg(&mut self, reference: OrderRef) {
        let filled = match self.store.get(reference) {
            Ok(order) => order.status == OrderStatus::Filled,
            Err(_) => return,
        };
        if filled && !self.bridge.has_pending_for(reference) {
            // Removal from store and from every sub-book index in one step.
            let _ = self.store.remove(reference);
            self.book.remove_everywhere(reference);
            log::info!("order settled and retired order={}", reference.0);
        }
    }

    fn revert_leg(&mut self, reference: OrderRef, debit: Decimal) {
        let Ok(order) = self.store.get_mut(reference) else {
            // Retired by an unrelated confirmed trade; do not resurrect.
            return;
        };
        order.quantity += debit;
        order.status = OrderStatus::Open;
        let kind = order.kind;
        self.book.push(kind, reference);
        log::info!(
            "trade reverted order={} restored={}",
            reference.0,
            debit
        );
    }

    // ---- internal pipeline ----

    /// Best-effort balance check: the amount of `token_in` the order needs,
    /// when computable at submission time (skipped for exact-out market
    /// orders, whose cost depends on the eventual fill price). A cost that
    /// overflows the decimal range is a validation error.
    fn required_in(&self, params: &NewOrder) -> Result<Option<Decimal>> {
        match params.direction {
            SwapDirection::ExactIn => Ok(Some(params.quantity)),
            SwapDirection::ExactOut if params.price > Decimal::ZERO => {
                let required = match params.side {
                    Side::Buy => params.quantity.checked_mul(params.price),
                    Side::Sell => params.quantity.checked_div(params.price),
                };
                required.map(Some).ok_or_else(|| {
                    EngineError::Validation(format!(
                        "order cost overflows at quantity {} price {}",
                        params.quantity, params.price
                    ))
                })
            }
            SwapDirection::ExactOut => Ok(None),
        }
    }

    fn submit(&mut self, params: NewOrder) -> Result<(OrderRef, Vec<Fill>)> {
        if let Some(vault) = &self.vault {
            if let Some(required) = self.required_in(&params)? {
                let held = vault.balance(params.party, params.token_in);
                if held < required {
                    return Err(EngineError::Validation(format!(
                        "party {} holds {} of token {}, order needs {}",
                        params.party.0, held, params.token_in.0, required
                    )));
                }
            }
        }
        self.clock += 1;
        let kind = params.kind;
        let (reference, stamp) = self.store.create(params, self.clock)?;
        self.clock = stamp;
        self.book.push(kind, reference);
        log::info!(
            "order submitted order={} kind={:?} stamp={}",
            reference.0,
            kind,
            stamp
        );
        let fills = self.run_cascade(reference)?;
        Ok((reference, fills))
    }

    /// Runs matching for one order, then promotes and matches any limit/stop
    /// orders made eligible by the moving clearing price, sharing one fill
    /// budget across the whole cascade.
    fn run_cascade(&mut self, first: OrderRef) -> Result<Vec<Fill>> {
        let mut budget = self.config.max_fills_per_submission;
        let mut queue = VecDeque::from([first]);
        let mut all_fills = Vec::new();
        while let Some(next) = queue.pop_front() {
            if budget == 0 {
                break;
            }
            let fills = match_order(
                &mut self.store,
                &mut self.book,
                next,
                self.last_price,
                &mut budget,
            )?;
            if fills.is_empty() {
                continue;
            }
            self.last_price = fills.last().map(|f| f.price);
            for fill in &fills {
                self.bridge
                    .report(fill, self.config.security, self.config.currency, self.clock);
            }
            all_fills.extend(fills);
            if let Some(clearing) = self.last_price {
                for eligible in trigger::eligible_orders(&self.store, &self.book, clearing)? {
                    trigger::promote(&mut self.store, &mut self.book, eligible)?;
                    queue.push_back(eligible);
                }
            }
        }
        if budget == 0 {
            log::warn!("fill budget exhausted; remaining quantity left resting");
        }
        Ok(all_fills)
    }
}
