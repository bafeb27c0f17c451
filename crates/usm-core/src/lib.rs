//! Pricing and ledger engine for a two-token collateral pool.
//!
//! A stable token (USM) is minted against pooled collateral (ETH) and a
//! funding token (FUM) holds the residual buffer. Every trade is priced along
//! a sliding integral, recent activity skews prices through decaying
//! adjustment factors, and a decaying minimum FUM buy price protects funders
//! once the debt ratio passes its maximum.

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod oracle;
pub mod pool;
pub mod pricing;
pub mod status;
pub mod types;

pub use clock::Clock;
pub use config::{EngineConfig, OracleConfig};
pub use decay::{DecayKind, DecayedSignal};
pub use engine::PoolEngine;
pub use error::{PoolError, Result};
pub use events::{EngineEvent, FundLeg, FundPricing};
pub use guard::{DebtRatioGuard, FloorState, FloorTrigger, BURN_DEBT_RATIO_LIMIT};
pub use ledger::TokenLedger;
pub use oracle::OracleFeed;
pub use pool::CollateralPool;
pub use pricing::{AdjustmentFactors, PriceOptions, Pricing};
pub use status::{FloorStatus, PoolStatus, Quote};
pub use types::{HolderId, PriceSide, Token};
