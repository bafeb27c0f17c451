use thiserror::Error;

use crate::types::{HolderId, PriceSide, Token};

/// Errors from the collateral pool engine.
///
/// Every variant is a rejection: the instruction that produced it left the
/// engine exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    // --- Ledger errors ---
    #[error("insufficient {token} balance: {holder} requested {requested}, holds {available}")]
    InsufficientBalance {
        token: Token,
        holder: HolderId,
        requested: f64,
        available: f64,
    },

    // --- Pool errors ---
    #[error("insufficient pool liquidity: removal of {requested} ETH exceeds pool balance {available} ETH")]
    InsufficientPoolLiquidity { requested: f64, available: f64 },

    // --- Solvency errors ---
    #[error("{operation} would leave the debt ratio at {resulting_ratio:.4}, above the limit {limit:.4}")]
    SolvencyViolation {
        operation: &'static str,
        resulting_ratio: f64,
        limit: f64,
    },

    // --- Input errors ---
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // --- Pricing errors ---
    #[error("{token} {side} price is undefined while no {token} is outstanding")]
    UndefinedPrice { token: Token, side: PriceSide },

    // --- Configuration errors ---
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PoolError {
    /// Reject a quantity that must be strictly positive and finite.
    pub fn non_positive(field: &str, value: f64) -> Self {
        Self::InvalidInput(format!("{} must be a positive finite number, got {}", field, value))
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Validate that `value` is finite and strictly positive.
pub(crate) fn require_positive(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PoolError::non_positive(field, value))
    }
}
