use tracing::info;

use crate::error::{require_positive, Result};
use crate::types::PriceSide;

/// Current collateral quote from the external price feed.
///
/// Only the latest buy/sell pair is kept; `buy >= sell` is not enforced so
/// callers can simulate an inverted book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleFeed {
    buy_price: f64,
    sell_price: f64,
}

impl OracleFeed {
    pub fn new(sell_price: f64, buy_price: f64) -> Result<Self> {
        Ok(Self {
            sell_price: require_positive("oracle sell price", sell_price)?,
            buy_price: require_positive("oracle buy price", buy_price)?,
        })
    }

    /// Replace the quote. A missing buy price means a zero-spread quote.
    pub fn set(&mut self, sell_price: f64, buy_price: Option<f64>) -> Result<()> {
        let updated = Self::new(sell_price, buy_price.unwrap_or(sell_price))?;
        info!(
            sell = updated.sell_price,
            buy = updated.buy_price,
            "Oracle price updated"
        );
        *self = updated;
        Ok(())
    }

    pub fn buy_price(&self) -> f64 {
        self.buy_price
    }

    pub fn sell_price(&self) -> f64 {
        self.sell_price
    }

    pub fn mid_price(&self) -> f64 {
        (self.buy_price + self.sell_price) / 2.0
    }

    /// Raw quote for a side, with no adjustment applied.
    pub fn quote(&self, side: PriceSide) -> f64 {
        match side {
            PriceSide::Buy => self.buy_price,
            PriceSide::Sell => self.sell_price,
            PriceSide::Mid => self.mid_price(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;

    #[test]
    fn set_without_buy_price_collapses_spread() {
        let mut oracle = OracleFeed::new(198.0, 202.0).unwrap();
        oracle.set(150.0, None).unwrap();
        assert_eq!(oracle.quote(PriceSide::Buy), 150.0);
        assert_eq!(oracle.quote(PriceSide::Sell), 150.0);
        assert_eq!(oracle.quote(PriceSide::Mid), 150.0);
    }

    #[test]
    fn mid_is_arithmetic_mean() {
        let oracle = OracleFeed::new(198.0, 202.0).unwrap();
        assert_eq!(oracle.mid_price(), 200.0);
    }

    #[test]
    fn inverted_quote_is_accepted() {
        let oracle = OracleFeed::new(210.0, 190.0).unwrap();
        assert_eq!(oracle.buy_price(), 190.0);
        assert_eq!(oracle.sell_price(), 210.0);
    }

    #[test]
    fn rejected_update_keeps_previous_quote() {
        let mut oracle = OracleFeed::new(198.0, 202.0).unwrap();
        let err = oracle.set(0.0, Some(10.0)).unwrap_err();
        assert!(matches!(err, PoolError::InvalidInput(_)));
        assert_eq!(oracle.mid_price(), 200.0);
    }
}
