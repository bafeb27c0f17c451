use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{require_positive, PoolError, Result};
use crate::types::{HolderId, Token};

/// Holder balances for one token.
///
/// Absent holders read as zero and reads never insert. A debit that brings a
/// balance to zero removes the entry, so the map only ever holds positive
/// balances and their sum is the outstanding supply.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLedger {
    token: Token,
    balances: BTreeMap<HolderId, f64>,
}

impl TokenLedger {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            balances: BTreeMap::new(),
        }
    }

    pub fn balance_of(&self, holder: &HolderId) -> f64 {
        self.balances.get(holder).copied().unwrap_or(0.0)
    }

    /// Total supply held across all holders.
    pub fn outstanding(&self) -> f64 {
        self.balances.values().sum()
    }

    /// Fail unless `holder` owns at least `amount`.
    pub fn ensure_balance(&self, holder: &HolderId, amount: f64) -> Result<()> {
        let available = self.balance_of(holder);
        if amount > available {
            return Err(PoolError::InsufficientBalance {
                token: self.token,
                holder: holder.clone(),
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn credit(&mut self, holder: &HolderId, amount: f64) -> Result<()> {
        require_positive("credit amount", amount)?;
        let balance = self.balances.entry(holder.clone()).or_insert(0.0);
        *balance += amount;
        debug!(
            token = %self.token,
            holder = %holder,
            amount,
            balance = *balance,
            "Ledger credited"
        );
        Ok(())
    }

    pub fn debit(&mut self, holder: &HolderId, amount: f64) -> Result<()> {
        require_positive("debit amount", amount)?;
        self.ensure_balance(holder, amount)?;

        let remaining = self.balance_of(holder) - amount;
        if remaining > 0.0 {
            self.balances.insert(holder.clone(), remaining);
        } else {
            self.balances.remove(holder);
        }
        debug!(
            token = %self.token,
            holder = %holder,
            amount,
            balance = remaining.max(0.0),
            "Ledger debited"
        );
        Ok(())
    }

    /// Sorted copy of all non-zero balances.
    pub fn snapshot(&self) -> BTreeMap<HolderId, f64> {
        self.balances.clone()
    }
}
