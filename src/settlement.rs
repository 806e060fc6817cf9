//! Trade reporting and the two-phase settlement bridge.
//!
//! A match produces a Pending [`Trade`]; the external settlement collaborator
//! is notified through [`SettlementGateway`] (a one-way call made after the
//! engine's own state is already consistent) and later calls back to confirm
//! or reject. Confirm and reject are capability-checked: only the configured
//! settlement agent may finalize or reverse a trade. Terminal trades are kept
//! archived so a repeated confirm/reject surfaces as an invalid-state error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::error::{EngineError, Result};
use crate::matching::Fill;
use crate::types::{OrderRef, PartyId, SettlementStatus, TokenId, TradeId};

/// Economic terms sent to the settlement collaborator. The collaborator is
/// the authority that actually moves vault balances; the engine only reports.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TradeTerms {
    pub trade_id: TradeId,
    pub security: TokenId,
    pub currency: TokenId,
    pub maker_party: PartyId,
    pub taker_party: PartyId,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// One-way notification channel to the settlement collaborator.
pub trait SettlementGateway: Send + Sync {
    fn post_settlement(&self, terms: &TradeTerms);

    /// Transfer agent of record for a party, when the collaborator tracks
    /// one. Consumed by hosts; the engine itself never calls it.
    fn transfer_agent(&self, _party: PartyId) -> Option<PartyId> {
        None
    }
}

/// Writes one JSON line per reported trade to stdout.
pub struct StdoutGateway;

impl SettlementGateway for StdoutGateway {
    fn post_settlement(&self, terms: &TradeTerms) {
        if let Ok(line) = serde_json::to_string(terms) {
            println!("{}", line);
        }
    }
}

/// Records posted terms in memory for tests. Clone shares the same buffer.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    posted: Arc<Mutex<Vec<TradeTerms>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<TradeTerms> {
        self.posted.lock().expect("lock").clone()
    }
}

impl SettlementGateway for RecordingGateway {
    fn post_settlement(&self, terms: &TradeTerms) {
        self.posted.lock().expect("lock").push(terms.clone());
    }
}

/// Immutable record of one match, created the instant the fill occurs.
///
/// `maker_debit` / `taker_debit` are the exact per-leg quantity decrements in
/// each order's own denomination; rejection restores precisely these amounts.
#[derive(Clone, Debug)]
pub struct Trade {
    pub trade_id: TradeId,
    pub maker_ref: OrderRef,
    pub taker_ref: OrderRef,
    pub maker_party: PartyId,
    pub taker_party: PartyId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub maker_debit: Decimal,
    pub taker_debit: Decimal,
    pub status: SettlementStatus,
    pub executed_at: u64,
}

/// Owns trade records from report until settlement finalizes them.
pub struct SettlementBridge {
    agent: PartyId,
    gateway: Box<dyn SettlementGateway>,
    trades: HashMap<TradeId, Trade>,
    next_trade_id: u64,
}

impl SettlementBridge {
    pub fn new(agent: PartyId, gateway: Box<dyn SettlementGateway>) -> Self {
        Self {
            agent,
            gateway,
            trades: HashMap::new(),
            next_trade_id: 1,
        }
    }

    fn require_agent(&self, caller: PartyId) -> Result<()> {
        if caller != self.agent {
            return Err(EngineError::Unauthorized(format!(
                "party {} is not the settlement agent",
                caller.0
            )));
        }
        Ok(())
    }

    /// Creates a Pending trade from a fill and notifies the collaborator with
    /// its economic terms. No token movement happens here.
    pub fn report(
        &mut self,
        fill: &Fill,
        security: TokenId,
        currency: TokenId,
        executed_at: u64,
    ) -> TradeId {
        let trade_id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        let trade = Trade {
            trade_id,
            maker_ref: fill.maker,
            taker_ref: fill.taker,
            maker_party: fill.maker_party,
            taker_party: fill.taker_party,
            price: fill.price,
            quantity: fill.quantity,
            maker_debit: fill.maker_debit,
            taker_debit: fill.taker_debit,
            status: SettlementStatus::Pending,
            executed_at,
        };
        let terms = TradeTerms {
            trade_id,
            security,
            currency,
            maker_party: trade.maker_party,
            taker_party: trade.taker_party,
            price: trade.price,
            quantity: trade.quantity,
        };
        self.trades.insert(trade_id, trade);
        self.gateway.post_settlement(&terms);
        log::info!(
            "trade reported trade_id={} maker={} taker={} price={} quantity={}",
            trade_id.0,
            fill.maker.0,
            fill.taker.0,
            fill.price,
            fill.quantity
        );
        trade_id
    }

    pub fn get(&self, trade_id: TradeId) -> Result<&Trade> {
        self.trades
            .get(&trade_id)
            .ok_or_else(|| EngineError::NotFound(format!("trade {}", trade_id.0)))
    }

    fn finalize(&mut self, caller: PartyId, trade_id: TradeId, status: SettlementStatus) -> Result<Trade> {
        self.require_agent(caller)?;
        let trade = self
            .trades
            .get_mut(&trade_id)
            .ok_or_else(|| EngineError::NotFound(format!("trade {}", trade_id.0)))?;
        if trade.status != SettlementStatus::Pending {
            return Err(EngineError::InvalidState(format!(
                "trade {} is {:?}, not Pending",
                trade_id.0, trade.status
            )));
        }
        trade.status = status;
        Ok(trade.clone())
    }

    /// Marks a Pending trade Confirmed (terminal). Returns the trade so the
    /// engine can retire fully-settled orders.
    pub fn confirm(&mut self, caller: PartyId, trade_id: TradeId) -> Result<Trade> {
        let trade = self.finalize(caller, trade_id, SettlementStatus::Confirmed)?;
        log::info!("trade confirmed trade_id={}", trade_id.0);
        Ok(trade)
    }

    /// Marks a Pending trade Rejected (terminal). Returns the trade so the
    /// engine can run the compensating reversal. A second reject of the same
    /// trade is an invalid-state error, which keeps reversal per-trade
    /// idempotent.
    pub fn reject(&mut self, caller: PartyId, trade_id: TradeId) -> Result<Trade> {
        let trade = self.finalize(caller, trade_id, SettlementStatus::Rejected)?;
        log::info!("trade rejected trade_id={}", trade_id.0);
        Ok(trade)
    }

    /// Capability check for the collaborator-facing reversal entry point.
    pub fn authorize_agent(&self, caller: PartyId) -> Result<()> {
        self.require_agent(caller)
    }

    /// Resolves the trade whose recorded leg debit matches
    /// `(reference, quantity)`. Only a Pending trade resolves; a terminal
    /// match is an invalid-state error, an unknown leg is not found.
    pub fn pending_leg(&self, reference: OrderRef, quantity: Decimal) -> Result<TradeId> {
        let mut terminal = None;
        for trade in self.trades.values() {
            let leg = (trade.maker_ref == reference && trade.maker_debit == quantity)
                || (trade.taker_ref == reference && trade.taker_debit == quantity);
            if !leg {
                continue;
            }
            if trade.status == SettlementStatus::Pending {
                return Ok(trade.trade_id);
            }
            terminal = Some(trade.trade_id);
        }
        match terminal {
            Some(id) => Err(EngineError::InvalidState(format!(
                "trade {} is no longer pending",
                id.0
            ))),
            None => Err(EngineError::NotFound(format!(
                "no pending trade debits {} from order {}",
                quantity, reference.0
            ))),
        }
    }

    /// True if any Pending trade still references the order. Confirm-time
    /// order deletion is gated on this so reversing a sibling trade can never
    /// resurrect a retired order.
    pub fn has_pending_for(&self, reference: OrderRef) -> bool {
        self.trades.values().any(|t| {
            t.status == SettlementStatus::Pending
                && (t.maker_ref == reference || t.taker_ref == reference)
        })
    }

    pub fn pending_count(&self) -> usize {
        self.trades
            .values()
            .filter(|t| t.status == SettlementStatus::Pending)
            .count()
    }
}
