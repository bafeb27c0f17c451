//! Instruction-line parsing
//!
//! One instruction per line, whitespace separated:
//!
//! ```text
//! price 150          # ETH sell and buy price both $150
//! price 198/202      # sell $198, buy $202
//! mint A 10          # A adds 10 ETH for USM
//! burn A 1000        # A burns 1,000 USM for ETH
//! fund_eth B 5       # B adds 5 ETH for FUM
//! fund_usm B 1000    # B converts 1,000 USM into FUM
//! defund B 1000      # B redeems 1,000 FUM for ETH
//! wait 300           # advance the clock 300 seconds
//! status
//! ```
//!
//! Blank lines and anything after `#` are ignored.

use usm_core::HolderId;

use crate::error::{CliError, CliResult};

/// A parsed instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Price { sell: f64, buy: Option<f64> },
    Mint { holder: HolderId, collateral: f64 },
    Burn { holder: HolderId, stable: f64 },
    FundFromCollateral { holder: HolderId, collateral: f64 },
    FundFromStable { holder: HolderId, stable: f64 },
    Redeem { holder: HolderId, funding: f64 },
    Wait { secs: f64 },
    Status,
}

impl Command {
    /// Instruction keyword, as typed.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Price { .. } => "price",
            Command::Mint { .. } => "mint",
            Command::Burn { .. } => "burn",
            Command::FundFromCollateral { .. } => "fund_eth",
            Command::FundFromStable { .. } => "fund_usm",
            Command::Redeem { .. } => "defund",
            Command::Wait { .. } => "wait",
            Command::Status => "status",
        }
    }
}

/// Parse one line; `Ok(None)` for blank and comment-only lines.
pub fn parse_line(line: &str) -> CliResult<Option<Command>> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&keyword, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match keyword {
        "price" => {
            let [prices] = expect_args::<1>(keyword, args, "<sell>[/<buy>]")?;
            match prices.split_once('/') {
                Some((sell, buy)) => Command::Price {
                    sell: number(sell)?,
                    buy: Some(number(buy)?),
                },
                None => Command::Price {
                    sell: number(prices)?,
                    buy: None,
                },
            }
        }
        "mint" => {
            let (holder, collateral) = holder_amount(keyword, args, "<holder> <eth>")?;
            Command::Mint { holder, collateral }
        }
        "burn" => {
            let (holder, stable) = holder_amount(keyword, args, "<holder> <usm>")?;
            Command::Burn { holder, stable }
        }
        "fund_eth" => {
            let (holder, collateral) = holder_amount(keyword, args, "<holder> <eth>")?;
            Command::FundFromCollateral { holder, collateral }
        }
        "fund_usm" => {
            let (holder, stable) = holder_amount(keyword, args, "<holder> <usm>")?;
            Command::FundFromStable { holder, stable }
        }
        "defund" => {
            let (holder, funding) = holder_amount(keyword, args, "<holder> <fum>")?;
            Command::Redeem { holder, funding }
        }
        "wait" => {
            let [secs] = expect_args::<1>(keyword, args, "<seconds>")?;
            Command::Wait { secs: number(secs)? }
        }
        "status" => {
            expect_args::<0>(keyword, args, "")?;
            Command::Status
        }
        other => {
            return Err(CliError::Parse(format!(
                "unrecognized command '{}'",
                other
            )))
        }
    };
    Ok(Some(command))
}

fn expect_args<'a, const N: usize>(
    keyword: &str,
    args: &[&'a str],
    usage: &str,
) -> CliResult<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| {
        CliError::Parse(format!("usage: {} {}", keyword, usage).trim_end().to_string())
    })
}

fn holder_amount(keyword: &str, args: &[&str], usage: &str) -> CliResult<(HolderId, f64)> {
    let [holder, amount] = expect_args::<2>(keyword, args, usage)?;
    Ok((HolderId::from(holder), number(amount)?))
}

fn number(word: &str) -> CliResult<f64> {
    word.replace(',', "")
        .parse::<f64>()
        .map_err(|_| CliError::Parse(format!("invalid number '{}'", word)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_price_with_and_without_spread() {
        assert_eq!(
            parse("price 150"),
            Command::Price {
                sell: 150.0,
                buy: None
            }
        );
        assert_eq!(
            parse("price 198/202"),
            Command::Price {
                sell: 198.0,
                buy: Some(202.0)
            }
        );
    }

    #[test]
    fn test_holder_commands() {
        assert_eq!(
            parse("mint A 10"),
            Command::Mint {
                holder: HolderId::new("A"),
                collateral: 10.0
            }
        );
        assert_eq!(
            parse("  fund_usm   B 1,000 "),
            Command::FundFromStable {
                holder: HolderId::new("B"),
                stable: 1_000.0
            }
        );
        assert_eq!(parse("defund C 2.5").keyword(), "defund");
        assert_eq!(parse("fund_eth C 2.5").keyword(), "fund_eth");
        assert_eq!(parse("burn C 2.5").keyword(), "burn");
    }

    #[test]
    fn test_wait_and_status() {
        assert_eq!(parse("wait 300"), Command::Wait { secs: 300.0 });
        assert_eq!(parse("status"), Command::Status);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# setup").unwrap().is_none());
        assert_eq!(parse("status # show pool"), Command::Status);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let err = parse_line("mint A").unwrap_err();
        assert_eq!(err.to_string(), "Parse error: usage: mint <holder> <eth>");
        assert!(matches!(parse_line("mint A ten"), Err(CliError::Parse(_))));
        assert!(matches!(parse_line("price 1/x"), Err(CliError::Parse(_))));
        assert!(matches!(parse_line("status now"), Err(CliError::Parse(_))));
        let err = parse_line("sell A 1").unwrap_err();
        assert!(err.to_string().contains("unrecognized command 'sell'"));
    }

    #[test]
    fn test_negative_amounts_are_left_to_the_engine() {
        assert_eq!(
            parse("burn A -5"),
            Command::Burn {
                holder: HolderId::new("A"),
                stable: -5.0
            }
        );
    }
}
