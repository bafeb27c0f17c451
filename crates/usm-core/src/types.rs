use serde::{Deserialize, Serialize};

/// Holder identifier: the name a simulated user trades under (e.g. "A", "B").
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HolderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The two claim tokens issued against the collateral pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// Fully backed stable-value claim (USM).
    Stable,
    /// Leveraged residual claim on the buffer (FUM).
    Funding,
}

impl Token {
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Stable => "USM",
            Token::Funding => "FUM",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which side of the market a price is quoted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSide {
    Buy,
    Sell,
    Mid,
}

impl PriceSide {
    /// The side a counterparty sees: buying one asset is selling the other.
    pub fn opposite(self) -> Self {
        match self {
            PriceSide::Buy => PriceSide::Sell,
            PriceSide::Sell => PriceSide::Buy,
            PriceSide::Mid => PriceSide::Mid,
        }
    }
}

impl std::fmt::Display for PriceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PriceSide::Buy => "buy",
            PriceSide::Sell => "sell",
            PriceSide::Mid => "mid",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_side_swaps_buy_and_sell_only() {
        assert_eq!(PriceSide::Buy.opposite(), PriceSide::Sell);
        assert_eq!(PriceSide::Sell.opposite(), PriceSide::Buy);
        assert_eq!(PriceSide::Mid.opposite(), PriceSide::Mid);
    }

    #[test]
    fn holder_ids_order_lexically() {
        let mut holders = vec![HolderId::new("B"), HolderId::new("A")];
        holders.sort();
        assert_eq!(holders[0], HolderId::from("A"));
        assert_eq!(holders[1].to_string(), "B");
    }
}
