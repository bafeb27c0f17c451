use crate::error::{require_positive, PoolError, Result};

/// Collateral (ETH) held by the pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollateralPool {
    balance: f64,
}

impl CollateralPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn is_empty(&self) -> bool {
        self.balance <= 0.0
    }

    pub fn deposit(&mut self, amount: f64) -> Result<()> {
        require_positive("collateral deposit", amount)?;
        self.balance += amount;
        Ok(())
    }

    /// Remove collateral; a zero amount is a no-op so that operations whose
    /// integral rounds to nothing still commit their ledger side.
    pub fn withdraw(&mut self, amount: f64) -> Result<()> {
        if !(amount.is_finite() && amount >= 0.0) {
            return Err(PoolError::InvalidInput(format!(
                "collateral withdrawal must be a non-negative finite number, got {}",
                amount
            )));
        }
        if amount > self.balance {
            return Err(PoolError::InsufficientPoolLiquidity {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance = (self.balance - amount).max(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_then_withdraw() {
        let mut pool = CollateralPool::new();
        assert!(pool.is_empty());
        pool.deposit(10.0).unwrap();
        pool.withdraw(4.0).unwrap();
        assert_eq!(pool.balance(), 6.0);
    }

    #[test]
    fn overdraw_reports_liquidity() {
        let mut pool = CollateralPool::new();
        pool.deposit(1.0).unwrap();
        let err = pool.withdraw(2.0).unwrap_err();
        assert_eq!(
            err,
            PoolError::InsufficientPoolLiquidity {
                requested: 2.0,
                available: 1.0
            }
        );
        assert_eq!(pool.balance(), 1.0);
    }

    #[test]
    fn withdraw_entire_balance_empties_pool() {
        let mut pool = CollateralPool::new();
        pool.deposit(3.0).unwrap();
        pool.withdraw(3.0).unwrap();
        assert!(pool.is_empty());
    }
}
