use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PoolError, Result};

/// Debt ratio a burn may leave behind: USM must stay fully backed.
pub const BURN_DEBT_RATIO_LIMIT: f64 = 1.0;

const CROSSING_SEARCH_ITERATIONS: usize = 200;

/// Whether the minimum FUM buy price is currently installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorState {
    Inactive,
    Active,
}

/// Which path installed the minimum FUM buy price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorTrigger {
    /// An oracle move pushed the debt ratio over the maximum.
    PriceChange,
    /// A mint pushed the debt ratio over the maximum.
    Mint,
    /// The first FUM was created while the ratio was already over the maximum.
    FirstFunding,
    /// The post-operation check found an uncovered excursion.
    Reconciliation,
}

/// Solvency guard around the pool's debt ratio.
///
/// Owns the maximum debt ratio and the closed-form (or searched) crossing
/// points used to price the minimum FUM buy price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebtRatioGuard {
    max_debt_ratio: f64,
}

impl DebtRatioGuard {
    pub fn new(max_debt_ratio: f64) -> Self {
        Self { max_debt_ratio }
    }

    pub fn max_debt_ratio(&self) -> f64 {
        self.max_debt_ratio
    }

    /// Outstanding USM over pool value; 0 for an empty (valueless) pool.
    pub fn debt_ratio(stable_outstanding: f64, pool_value: f64) -> f64 {
        if pool_value <= 0.0 {
            0.0
        } else {
            stable_outstanding / pool_value
        }
    }

    /// Debt ratio as seen by the burn and redeem checks. A pool left with no
    /// value while USM is still outstanding is unbounded, not empty.
    pub fn post_trade_ratio(stable_outstanding: f64, pool_value: f64) -> f64 {
        if pool_value <= 0.0 && stable_outstanding > 0.0 {
            f64::INFINITY
        } else {
            Self::debt_ratio(stable_outstanding, pool_value)
        }
    }

    pub fn exceeds_max(&self, ratio: f64) -> bool {
        ratio > self.max_debt_ratio
    }

    /// A burn may not leave USM under-collateralized.
    pub fn check_burn(&self, resulting_ratio: f64) -> Result<()> {
        Self::check("burn", resulting_ratio, BURN_DEBT_RATIO_LIMIT)
    }

    /// A redeem may not push the ratio above the maximum.
    pub fn check_redeem(&self, resulting_ratio: f64) -> Result<()> {
        Self::check("redeem", resulting_ratio, self.max_debt_ratio)
    }

    fn check(operation: &'static str, resulting_ratio: f64, limit: f64) -> Result<()> {
        if resulting_ratio > limit {
            debug!(operation, resulting_ratio, limit, "Solvency check failed");
            return Err(PoolError::SolvencyViolation {
                operation,
                resulting_ratio,
                limit,
            });
        }
        Ok(())
    }

    /// The floor must be installed: ratio over the maximum, floor not yet
    /// installed, and some FUM outstanding to protect.
    pub fn floor_needs_installing(
        &self,
        ratio: f64,
        floor: FloorState,
        funding_outstanding: f64,
    ) -> bool {
        floor == FloorState::Inactive && self.exceeds_max(ratio) && funding_outstanding > 0.0
    }

    pub fn floor_is_obsolete(&self, ratio: f64, floor: FloorState) -> bool {
        floor == FloorState::Active && !self.exceeds_max(ratio)
    }

    /// FUM price in collateral units at the instant the ratio equals the
    /// maximum, for a pool of `pool_collateral` ETH.
    ///
    /// At that instant the buffer holds `pool * (1 - max)` ETH, e.g. 400 ETH
    /// and 1,000 FUM give 80 / 1,000 = 0.08 ETH per FUM whatever the ETH price.
    pub fn funding_price_at_max_ratio(&self, pool_collateral: f64, funding_outstanding: f64) -> f64 {
        if funding_outstanding <= 0.0 {
            return 0.0;
        }
        pool_collateral * (1.0 - self.max_debt_ratio) / funding_outstanding
    }

    /// Collateral that must be added (with no new USM) to bring the ratio down
    /// to exactly the maximum. Non-positive when already at or below it.
    pub fn collateral_to_reach_max(
        &self,
        stable_outstanding: f64,
        pool_collateral: f64,
        collateral_mid: f64,
    ) -> f64 {
        stable_outstanding / (collateral_mid * self.max_debt_ratio) - pool_collateral
    }

    /// Pool size at which a mint growing the pool from `pool_before` to
    /// `pool_after` crosses the maximum ratio.
    ///
    /// `stable_at(p)` gives outstanding USM once the pool has reached `p`.
    /// With the sliding mint price that is `U0 + P0 * s * ln(p / P0)`, which
    /// has no elementary inverse, so the root of
    /// `stable_at(p) - max * mid * p` is bracketed and bisected. The function
    /// is concave in `p`, so the bracket holds exactly one sign change.
    pub fn mint_crossing_pool(
        &self,
        pool_before: f64,
        pool_after: f64,
        collateral_mid: f64,
        stable_at: impl Fn(f64) -> f64,
    ) -> f64 {
        let excess = |pool: f64| stable_at(pool) - self.max_debt_ratio * collateral_mid * pool;

        if excess(pool_before) >= 0.0 {
            return pool_before;
        }
        if excess(pool_after) <= 0.0 {
            return pool_after;
        }

        let (mut lo, mut hi) = (pool_before, pool_after);
        for _ in 0..CROSSING_SEARCH_ITERATIONS {
            let mid = lo + (hi - lo) / 2.0;
            if mid <= lo || mid >= hi {
                break;
            }
            if excess(mid) > 0.0 {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> DebtRatioGuard {
        DebtRatioGuard::new(0.8)
    }

    #[test]
    fn empty_pool_has_zero_ratio() {
        assert_eq!(DebtRatioGuard::debt_ratio(1_000.0, 0.0), 0.0);
        assert_eq!(DebtRatioGuard::debt_ratio(0.0, 500.0), 0.0);
        assert_eq!(DebtRatioGuard::debt_ratio(400.0, 500.0), 0.8);
    }

    #[test]
    fn drained_pool_with_outstanding_stable_is_unbounded() {
        assert_eq!(DebtRatioGuard::post_trade_ratio(199.0, 0.0), f64::INFINITY);
        assert_eq!(DebtRatioGuard::post_trade_ratio(0.0, 0.0), 0.0);
        assert_eq!(DebtRatioGuard::post_trade_ratio(400.0, 500.0), 0.8);
        assert!(guard().check_burn(f64::INFINITY).is_err());
        assert!(guard().check_redeem(f64::INFINITY).is_err());
    }

    #[test]
    fn burn_limit_is_full_backing() {
        assert!(guard().check_burn(1.0).is_ok());
        let err = guard().check_burn(1.01).unwrap_err();
        assert!(matches!(
            err,
            PoolError::SolvencyViolation {
                operation: "burn",
                limit,
                ..
            } if limit == 1.0
        ));
    }

    #[test]
    fn redeem_limit_is_max_ratio() {
        assert!(guard().check_redeem(0.8).is_ok());
        assert!(matches!(
            guard().check_redeem(0.81),
            Err(PoolError::SolvencyViolation { operation: "redeem", .. })
        ));
    }

    #[test]
    fn floor_state_transitions() {
        let g = guard();
        assert!(g.floor_needs_installing(0.9, FloorState::Inactive, 10.0));
        assert!(!g.floor_needs_installing(0.9, FloorState::Active, 10.0));
        assert!(!g.floor_needs_installing(0.9, FloorState::Inactive, 0.0));
        assert!(!g.floor_needs_installing(0.8, FloorState::Inactive, 10.0));
        assert!(g.floor_is_obsolete(0.8, FloorState::Active));
        assert!(!g.floor_is_obsolete(0.81, FloorState::Active));
        assert!(!g.floor_is_obsolete(0.5, FloorState::Inactive));
    }

    #[test]
    fn price_at_max_ratio_worked_example() {
        // 400 ETH, 1,000 FUM: the buffer holds 80 ETH when the ratio hits 0.8.
        let price = guard().funding_price_at_max_ratio(400.0, 1_000.0);
        assert!((price - 0.08).abs() < 1e-15);
        assert_eq!(guard().funding_price_at_max_ratio(400.0, 0.0), 0.0);
    }

    #[test]
    fn collateral_to_reach_max_restores_ratio() {
        let g = guard();
        // 40,000 USM against 200 ETH at $200: ratio 1.0.
        let needed = g.collateral_to_reach_max(40_000.0, 200.0, 200.0);
        assert!((needed - 50.0).abs() < 1e-9);
        let ratio = DebtRatioGuard::debt_ratio(40_000.0, (200.0 + needed) * 200.0);
        assert!((ratio - 0.8).abs() < 1e-12);
        assert!(g.collateral_to_reach_max(10_000.0, 200.0, 200.0) < 0.0);
    }

    #[test]
    fn mint_crossing_pool_solves_sliding_integral() {
        let g = guard();
        let (p0, u0, s, mid) = (100.0, 15_800.0, 198.0, 200.0);
        let stable_at = |p: f64| u0 + p0 * s * (p / p0).ln();
        let pc = g.mint_crossing_pool(p0, 120.0, mid, stable_at);
        assert!(pc > p0 && pc < 120.0);
        let ratio = DebtRatioGuard::debt_ratio(stable_at(pc), pc * mid);
        assert!((ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn mint_crossing_pool_clamps_to_bracket() {
        let g = guard();
        // Already over the maximum before the mint.
        assert_eq!(g.mint_crossing_pool(10.0, 20.0, 200.0, |_| 1_900.0), 10.0);
        // Never reaches the maximum.
        assert_eq!(g.mint_crossing_pool(10.0, 20.0, 200.0, |_| 100.0), 20.0);
    }
}
