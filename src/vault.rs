//! Consumed custody interface: the vault holds token balances per party and
//! moves them atomically once the settlement collaborator decides to.
//!
//! The engine never moves tokens itself. It only reads balances for the
//! best-effort sufficiency check on order submission.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{EngineError, Result};
use crate::types::{PartyId, TokenId};

/// Custody ledger holding security and currency token balances.
pub trait CustodyVault: Send + Sync {
    fn balance(&self, party: PartyId, token: TokenId) -> Decimal;

    fn transfer(
        &mut self,
        from: PartyId,
        to: PartyId,
        token: TokenId,
        amount: Decimal,
    ) -> Result<()>;
}

/// In-memory vault for tests and hosts without a real custody ledger.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    balances: HashMap<(PartyId, TokenId), Decimal>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, party: PartyId, token: TokenId, amount: Decimal) {
        *self.balances.entry((party, token)).or_insert(Decimal::ZERO) += amount;
    }
}

impl CustodyVault for InMemoryVault {
    fn balance(&self, party: PartyId, token: TokenId) -> Decimal {
        self.balances
            .get(&(party, token))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn transfer(
        &mut self,
        from: PartyId,
        to: PartyId,
        token: TokenId,
        amount: Decimal,
    ) -> Result<()> {
        let available = self.balance(from, token);
        if available < amount {
            return Err(EngineError::Validation(format!(
                "party {} holds {} of token {}, needs {}",
                from.0, available, token.0, amount
            )));
        }
        *self.balances.entry((from, token)).or_insert(Decimal::ZERO) -= amount;
        *self.balances.entry((to, token)).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_and_transfer() {
        let mut vault = InMemoryVault::new();
        vault.deposit(PartyId(1), TokenId(1), Decimal::from(10));
        vault
            .transfer(PartyId(1), PartyId(2), TokenId(1), Decimal::from(4))
            .unwrap();
        assert_eq!(vault.balance(PartyId(1), TokenId(1)), Decimal::from(6));
        assert_eq!(vault.balance(PartyId(2), TokenId(1)), Decimal::from(4));
    }

    #[test]
    fn transfer_rejects_insufficient_balance() {
        let mut vault = InMemoryVault::new();
        vault.deposit(PartyId(1), TokenId(1), Decimal::from(3));
        let err = vault
            .transfer(PartyId(1), PartyId(2), TokenId(1), Decimal::from(4))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(vault.balance(PartyId(1), TokenId(1)), Decimal::from(3));
    }
}
