use serde::{Deserialize, Serialize};

use crate::guard::FloorTrigger;
use crate::types::HolderId;

/// How one leg of a fund operation was priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundPricing {
    /// Flat price at the maximum-debt-ratio crossing, floor bypassed.
    AtMaxRatio,
    /// First FUM ever created, at a par price of 1.
    Par,
    /// Integral over a sliding FUM price as the pool grows.
    Sliding,
}

/// One priced leg of a fund operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundLeg {
    pub pricing: FundPricing,
    pub collateral_in: f64,
    pub funding_out: f64,
}

/// Structured notification emitted by the engine.
///
/// Events are queued on the engine and handed to the caller through
/// `PoolEngine::drain_events`; the engine itself never prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    OraclePriceSet {
        at: f64,
        sell_price: f64,
        buy_price: f64,
    },
    TimeAdvanced {
        at: f64,
        delta_secs: f64,
    },
    Minted {
        at: f64,
        holder: HolderId,
        collateral_in: f64,
        stable_out: f64,
    },
    Burned {
        at: f64,
        holder: HolderId,
        stable_in: f64,
        collateral_out: f64,
        /// The full-backing check was skipped (USM → FUM conversion).
        ratio_check_bypassed: bool,
    },
    Funded {
        at: f64,
        holder: HolderId,
        collateral_in: f64,
        funding_out: f64,
        legs: Vec<FundLeg>,
    },
    Redeemed {
        at: f64,
        holder: HolderId,
        funding_in: f64,
        collateral_out: f64,
    },
    FloorInstalled {
        at: f64,
        /// Minimum FUM buy price in collateral units.
        price_in_collateral: f64,
        /// The same price in pricing units at the time of installation.
        price: f64,
        debt_ratio: f64,
        trigger: FloorTrigger,
    },
    FloorCleared {
        at: f64,
        debt_ratio: f64,
        /// Cleared mid-operation by a fund that crossed back under the
        /// maximum, without waiting for the post-operation check.
        forced: bool,
    },
}

impl EngineEvent {
    /// Simulated time the event was recorded at.
    pub fn at(&self) -> f64 {
        match self {
            EngineEvent::OraclePriceSet { at, .. }
            | EngineEvent::TimeAdvanced { at, .. }
            | EngineEvent::Minted { at, .. }
            | EngineEvent::Burned { at, .. }
            | EngineEvent::Funded { at, .. }
            | EngineEvent::Redeemed { at, .. }
            | EngineEvent::FloorInstalled { at, .. }
            | EngineEvent::FloorCleared { at, .. } => *at,
        }
    }
}
