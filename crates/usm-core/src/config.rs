//! Engine configuration

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PoolError, Result};

/// Initial collateral oracle quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Collateral sell price in pricing units (USD per ETH)
    pub sell_price: f64,
    /// Collateral buy price in pricing units (USD per ETH)
    pub buy_price: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sell_price: 198.0,
            buy_price: 202.0,
        }
    }
}

/// Pool engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Redeems may not push the debt ratio above this bound; crossing it
    /// installs the minimum FUM buy price.
    pub max_debt_ratio: f64,

    /// Half-life of the mint/burn and fund/defund adjustments, in seconds.
    pub adjustment_half_life_secs: f64,

    /// Half-life of the minimum FUM buy price, in seconds.
    pub min_buy_price_half_life_secs: f64,

    /// Simulated time at engine start.
    pub start_time: DateTime<Utc>,

    /// Oracle quote at engine start.
    pub initial_oracle: OracleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_debt_ratio: 0.8,
            adjustment_half_life_secs: 60.0,
            min_buy_price_half_life_secs: 24.0 * 60.0 * 60.0,
            // 2020-08-01T00:00:00Z
            start_time: Utc.timestamp_opt(1_596_240_000, 0).single().unwrap_or_default(),
            initial_oracle: OracleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| PoolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PoolError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_debt_ratio > 0.0 && self.max_debt_ratio < 1.0) {
            return Err(PoolError::Config(format!(
                "max_debt_ratio must lie strictly between 0 and 1, got {}",
                self.max_debt_ratio
            )));
        }
        for (field, value) in [
            ("adjustment_half_life_secs", self.adjustment_half_life_secs),
            ("min_buy_price_half_life_secs", self.min_buy_price_half_life_secs),
            ("initial_oracle.sell_price", self.initial_oracle.sell_price),
            ("initial_oracle.buy_price", self.initial_oracle.buy_price),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PoolError::Config(format!(
                    "{} must be a positive finite number, got {}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Start time as seconds since the Unix epoch.
    pub fn start_timestamp(&self) -> f64 {
        self.start_time.timestamp() as f64
            + f64::from(self.start_time.timestamp_subsec_millis()) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_debt_ratio, 0.8);
        assert_eq!(config.start_timestamp(), 1_596_240_000.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_debt_ratio = 0.75

            [initial_oracle]
            sell_price = 150.0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_debt_ratio, 0.75);
        assert_eq!(config.initial_oracle.sell_price, 150.0);
        assert_eq!(config.initial_oracle.buy_price, 202.0);
        assert_eq!(config.adjustment_half_life_secs, 60.0);
    }

    #[test]
    fn test_start_time_parses_rfc3339() {
        let config =
            EngineConfig::from_toml_str(r#"start_time = "2021-01-01T00:00:00Z""#).unwrap();
        assert_eq!(config.start_timestamp(), 1_609_459_200.0);
    }

    #[test]
    fn test_rejects_out_of_range_ratio() {
        let err = EngineConfig::from_toml_str("max_debt_ratio = 1.0").unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_half_life() {
        let err = EngineConfig::from_toml_str("adjustment_half_life_secs = 0.0").unwrap_err();
        assert!(err.to_string().contains("adjustment_half_life_secs"));
    }

    #[test]
    fn test_load_missing_config() {
        let config = EngineConfig::load(Path::new("/nonexistent/path/usm.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
