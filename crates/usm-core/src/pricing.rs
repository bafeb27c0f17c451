use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::oracle::OracleFeed;
use crate::types::{PriceSide, Token};

/// Effective (already decayed) trading adjustments.
///
/// A factor above 1 pushes buy prices up, a factor below 1 pushes sell
/// prices down; each side only ever sees the part of a factor that moves it
/// against the trader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    pub mint_burn: f64,
    pub fund_defund: f64,
}

impl AdjustmentFactors {
    pub const NEUTRAL: Self = Self {
        mint_burn: 1.0,
        fund_defund: 1.0,
    };

    pub fn buy_multiplier(&self) -> f64 {
        self.mint_burn.max(1.0) * self.fund_defund.max(1.0)
    }

    pub fn sell_multiplier(&self) -> f64 {
        self.mint_burn.min(1.0) * self.fund_defund.min(1.0)
    }
}

impl Default for AdjustmentFactors {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Flags controlling how a quote is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceOptions {
    /// Apply the decayed mint/burn and fund/defund adjustments.
    pub adjusted: bool,
    /// Clamp FUM buy quotes to the minimum buy price. Ignored elsewhere.
    pub apply_floor: bool,
}

impl PriceOptions {
    /// Oracle-implied quote with no adjustment and no floor.
    pub const RAW: Self = Self {
        adjusted: false,
        apply_floor: false,
    };
}

impl Default for PriceOptions {
    fn default() -> Self {
        Self {
            adjusted: true,
            apply_floor: true,
        }
    }
}

/// Point-in-time pricing view of the pool.
///
/// Built by the engine from its ledgers, oracle, and decayed signals; all
/// quotes are in pricing units (USD) unless a name says otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub pool_collateral: f64,
    pub stable_outstanding: f64,
    pub funding_outstanding: f64,
    pub oracle: OracleFeed,
    pub adjustments: AdjustmentFactors,
    /// Decayed minimum FUM buy price in collateral units; 0 when inactive.
    pub min_funding_buy_price_in_collateral: f64,
}

impl Pricing {
    /// Collateral (ETH) price for a side.
    pub fn collateral_price(&self, side: PriceSide, options: PriceOptions) -> f64 {
        let quote = self.oracle.quote(side);
        if !options.adjusted {
            return quote;
        }
        match side {
            PriceSide::Buy => quote * self.adjustments.buy_multiplier(),
            PriceSide::Sell => quote * self.adjustments.sell_multiplier(),
            PriceSide::Mid => quote,
        }
    }

    pub fn collateral_mid(&self) -> f64 {
        self.oracle.mid_price()
    }

    /// Stable token (USM) price: the inverse cross rate of collateral, so
    /// buying USM means selling ETH.
    pub fn stable_token_price(&self, side: PriceSide, options: PriceOptions) -> f64 {
        self.collateral_mid() / self.collateral_price(side.opposite(), options)
    }

    /// Value of `collateral` ETH at `price`.
    pub fn pool_value_of(collateral: f64, price: f64) -> f64 {
        collateral * price
    }

    /// Pool value at the mid collateral price.
    pub fn pool_value(&self) -> f64 {
        Self::pool_value_of(self.pool_collateral, self.collateral_mid())
    }

    /// Pool value in excess of outstanding USM, at the given collateral price.
    pub fn buffer_value_at(&self, collateral_price: f64) -> f64 {
        Self::pool_value_of(self.pool_collateral, collateral_price) - self.stable_outstanding
    }

    pub fn buffer_value(&self) -> f64 {
        self.buffer_value_at(self.collateral_mid())
    }

    /// Minimum FUM buy price in pricing units; 0 when no floor is active.
    pub fn min_funding_buy_price(&self) -> f64 {
        self.min_funding_buy_price_in_collateral * self.collateral_mid()
    }

    /// Funding token (FUM) price for a side.
    ///
    /// With no FUM outstanding the first units are bought at par (1) and the
    /// other sides are undefined. Otherwise the buffer is valued at the
    /// unadjusted collateral price for the side, and adjustments are applied
    /// to the resulting FUM price rather than to the collateral price, so the
    /// skew is not levered up by the buffer.
    pub fn funding_token_price(&self, side: PriceSide, options: PriceOptions) -> Result<f64> {
        if self.funding_outstanding <= 0.0 {
            return match side {
                PriceSide::Buy => Ok(1.0),
                _ => Err(PoolError::UndefinedPrice {
                    token: Token::Funding,
                    side,
                }),
            };
        }

        let collateral_price = self.collateral_price(side, PriceOptions::RAW);
        let base = self.buffer_value_at(collateral_price) / self.funding_outstanding;

        let price = match side {
            PriceSide::Buy => {
                let mut price = base;
                if options.adjusted {
                    price *= self.adjustments.buy_multiplier();
                }
                if options.apply_floor {
                    price = price.max(self.min_funding_buy_price());
                }
                price
            }
            PriceSide::Sell => {
                let mut price = base;
                if options.adjusted {
                    price *= self.adjustments.sell_multiplier();
                }
                price.max(0.0)
            }
            PriceSide::Mid => base,
        };
        Ok(price)
    }

    /// FUM price expressed in collateral units.
    pub fn funding_token_price_in_collateral(
        &self,
        side: PriceSide,
        options: PriceOptions,
    ) -> Result<f64> {
        Ok(self.funding_token_price(side, options)? / self.collateral_mid())
    }
}
