//! Output formatting utilities

use std::collections::BTreeSet;

use colored::*;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use usm_core::{EngineEvent, HolderId, PoolStatus};

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines and tables
    #[default]
    Table,
    /// One JSON document per line
    Json,
}

/// Result of one executed instruction, as reported back to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    PriceSet {
        sell: f64,
        buy: f64,
    },
    TimeAdvanced {
        secs: f64,
        now: f64,
    },
    Minted {
        holder: HolderId,
        collateral_in: f64,
        stable_out: f64,
    },
    Burned {
        holder: HolderId,
        stable_in: f64,
        collateral_out: f64,
    },
    FundedFromCollateral {
        holder: HolderId,
        collateral_in: f64,
        funding_out: f64,
    },
    FundedFromStable {
        holder: HolderId,
        stable_in: f64,
        funding_out: f64,
    },
    Redeemed {
        holder: HolderId,
        funding_in: f64,
        collateral_out: f64,
    },
}

/// Render an instruction outcome.
pub fn render_outcome(outcome: &Outcome, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(outcome)?);
    }
    let line = match outcome {
        Outcome::PriceSet { sell, buy } => {
            format!("ETH price set to ${:.4}/${:.4}.", sell, buy)
        }
        Outcome::TimeAdvanced { secs, now } => {
            format!("Waited {}s, now {}.", secs, timestamp(*now))
        }
        Outcome::Minted {
            holder,
            collateral_in,
            stable_out,
        } => format!(
            "Minted {:.4} new USM for {} from {:.6} ETH, for {:.8} ETH each.",
            stable_out,
            holder,
            collateral_in,
            per_unit(*collateral_in, *stable_out)
        ),
        Outcome::Burned {
            holder,
            stable_in,
            collateral_out,
        } => format!(
            "Burned {:.4} of {}'s USM for {:.8} ETH each, yielding {:.6} ETH.",
            stable_in,
            holder,
            per_unit(*collateral_out, *stable_in),
            collateral_out
        ),
        Outcome::FundedFromCollateral {
            holder,
            collateral_in,
            funding_out,
        } => format!(
            "Created {:.4} new FUM for {} from {:.6} ETH, for {:.8} ETH each.",
            funding_out,
            holder,
            collateral_in,
            per_unit(*collateral_in, *funding_out)
        ),
        Outcome::FundedFromStable {
            holder,
            stable_in,
            funding_out,
        } => format!(
            "Created {:.4} new FUM for {} from {:.4} USM, for {:.6} USM each.",
            funding_out,
            holder,
            stable_in,
            per_unit(*stable_in, *funding_out)
        ),
        Outcome::Redeemed {
            holder,
            funding_in,
            collateral_out,
        } => format!(
            "Redeemed {:.4} of {}'s FUM for {:.8} ETH each, yielding {:.6} ETH.",
            funding_in,
            holder,
            per_unit(*collateral_out, *funding_in),
            collateral_out
        ),
    };
    Ok(line)
}

/// Render an engine event; `None` for events the outcome line already covers.
pub fn render_event(event: &EngineEvent, format: OutputFormat) -> CliResult<Option<String>> {
    if format == OutputFormat::Json {
        return Ok(Some(serde_json::to_string(event)?));
    }
    let line = match event {
        EngineEvent::FloorInstalled {
            price_in_collateral,
            price,
            debt_ratio,
            trigger,
            ..
        } => format!(
            "{} Setting min FUM buy price to {:.8} ETH (~${:.6}), since debt ratio {} is above the maximum ({:?}).",
            "*".yellow(),
            price_in_collateral,
            price,
            percent(*debt_ratio),
            trigger
        ),
        EngineEvent::FloorCleared {
            debt_ratio, forced, ..
        } => format!(
            "{} Resetting min FUM buy price, since debt ratio {} is back under the maximum{}.",
            "*".green(),
            percent(*debt_ratio),
            if *forced { " mid-fund" } else { "" }
        ),
        _ => return Ok(None),
    };
    Ok(Some(line))
}

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Holder")]
    holder: String,
    #[tabled(rename = "USM")]
    stable: String,
    #[tabled(rename = "FUM")]
    funding: String,
}

/// Render a full pool snapshot.
pub fn render_status(status: &PoolStatus, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(status)?);
    }

    let floor = match &status.min_funding_buy_price {
        Some(floor) => format!(
            ", min {:.8} ETH (~${:.6})",
            floor.price_in_collateral, floor.price
        ),
        None => String::new(),
    };
    let funding_sell = status
        .funding_sell_price
        .map(|p| format!("${:.6}", p))
        .unwrap_or_else(|| "n/a".to_string());

    let mut lines = vec![
        format!(
            "{}: {:.6} ETH at ${:.4} (${:.4}/${:.4}) = ${:.2} pool value",
            timestamp(status.time).bold(),
            status.pool_collateral,
            status.collateral_price.mid,
            status.collateral_price.sell,
            status.collateral_price.buy,
            status.pool_value
        ),
        format!(
            "{:.4} USM outstanding (${:.6}/${:.6}, adj {:.6}), buffer = ${:.2}, debt ratio = {}",
            status.stable_outstanding,
            status.stable_price.sell,
            status.stable_price.buy,
            status.mint_burn_adjustment,
            status.buffer_value,
            percent(status.debt_ratio)
        ),
        format!(
            "{:.4} FUM outstanding ({}/${:.6}{}, adj {:.6})",
            status.funding_outstanding,
            funding_sell,
            status.funding_buy_price,
            floor,
            status.fund_defund_adjustment
        ),
    ];

    let holders: BTreeSet<&HolderId> = status
        .stable_holdings
        .keys()
        .chain(status.funding_holdings.keys())
        .collect();
    if holders.is_empty() {
        lines.push("No holders".dimmed().to_string());
    } else {
        let rows = holders.into_iter().map(|holder| HoldingRow {
            holder: holder.to_string(),
            stable: balance(status.stable_holdings.get(holder)),
            funding: balance(status.funding_holdings.get(holder)),
        });
        lines.push(Table::new(rows).with(Style::modern()).to_string());
    }
    Ok(lines.join("\n"))
}

fn balance(amount: Option<&f64>) -> String {
    amount.map(|a| format!("{:.4}", a)).unwrap_or_else(|| "-".to_string())
}

fn per_unit(paid: f64, received: f64) -> f64 {
    if received > 0.0 {
        paid / received
    } else {
        0.0
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn timestamp(secs: f64) -> String {
    chrono::DateTime::from_timestamp_millis((secs * 1000.0).floor() as i64)
        .map(|dt| dt.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{}", secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use usm_core::{EngineConfig, FloorTrigger, PoolEngine};

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_outcome_line() {
        colored::control::set_override(false);
        let outcome = Outcome::Minted {
            holder: HolderId::new("A"),
            collateral_in: 1_000.0,
            stable_out: 198_000.0,
        };
        let line = render_outcome(&outcome, OutputFormat::Table).unwrap();
        assert_eq!(
            line,
            "Minted 198000.0000 new USM for A from 1000.000000 ETH, for 0.00505051 ETH each."
        );
        let json = render_outcome(&outcome, OutputFormat::Json).unwrap();
        assert!(json.starts_with(r#"{"outcome":"minted","holder":"A""#));
    }

    #[test]
    fn test_only_floor_events_render_as_text() {
        colored::control::set_override(false);
        let minted = EngineEvent::Minted {
            at: 0.0,
            holder: HolderId::new("A"),
            collateral_in: 1.0,
            stable_out: 198.0,
        };
        assert!(render_event(&minted, OutputFormat::Table).unwrap().is_none());
        assert!(render_event(&minted, OutputFormat::Json).unwrap().is_some());

        let installed = EngineEvent::FloorInstalled {
            at: 0.0,
            price_in_collateral: 0.002,
            price: 0.24,
            debt_ratio: 0.8333,
            trigger: FloorTrigger::PriceChange,
        };
        let line = render_event(&installed, OutputFormat::Table).unwrap().unwrap();
        assert_eq!(
            line,
            "* Setting min FUM buy price to 0.00200000 ETH (~$0.240000), since debt ratio 83.33% is above the maximum (PriceChange)."
        );
    }

    #[test]
    fn test_status_table_lists_holders() {
        colored::control::set_override(false);
        let mut engine = PoolEngine::new(EngineConfig::default()).unwrap();
        engine.mint(&HolderId::new("A"), 1_000.0).unwrap();
        let text = render_status(&engine.status(), OutputFormat::Table).unwrap();
        assert!(text.starts_with("2020/08/01 00:00:00: 1000.000000 ETH at $200.0000"));
        assert!(text.contains("debt ratio = 99.00%"));
        assert!(text.contains("n/a/$1.000000"));
        assert!(text.contains("198000.0000"));
    }

    #[test]
    fn test_empty_status_has_no_holders() {
        colored::control::set_override(false);
        let engine = PoolEngine::new(EngineConfig::default()).unwrap();
        let text = render_status(&engine.status(), OutputFormat::Table).unwrap();
        assert!(text.ends_with("No holders"));
    }
}
