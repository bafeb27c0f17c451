use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::HolderId;

/// Buy/sell/mid quote triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub buy: f64,
    pub sell: f64,
    pub mid: f64,
}

/// Active minimum FUM buy price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorStatus {
    pub price_in_collateral: f64,
    pub price: f64,
}

/// Full snapshot of the pool, as returned by `PoolEngine::status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Simulated time, seconds since the Unix epoch.
    pub time: f64,
    pub datetime: Option<DateTime<Utc>>,
    pub pool_collateral: f64,
    pub collateral_price: Quote,
    pub pool_value: f64,
    pub stable_outstanding: f64,
    /// Adjusted USM buy/sell quotes; mid is always 1.
    pub stable_price: Quote,
    pub buffer_value: f64,
    pub debt_ratio: f64,
    pub funding_outstanding: f64,
    /// Par (1) while no FUM is outstanding.
    pub funding_buy_price: f64,
    /// Absent while no FUM is outstanding.
    pub funding_sell_price: Option<f64>,
    pub min_funding_buy_price: Option<FloorStatus>,
    pub mint_burn_adjustment: f64,
    pub fund_defund_adjustment: f64,
    pub stable_holdings: BTreeMap<HolderId, f64>,
    pub funding_holdings: BTreeMap<HolderId, f64>,
}
