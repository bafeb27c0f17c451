//! Instruction session: feeds parsed lines to a [`PoolEngine`] and writes
//! outcomes, floor notices, and snapshots.

use std::io::{BufRead, Write};

use tracing::debug;
use usm_core::PoolEngine;

use crate::command::{parse_line, Command};
use crate::error::CliResult;
use crate::output::{render_event, render_outcome, render_status, OutputFormat, Outcome};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub rejected: usize,
}

pub struct Session {
    engine: PoolEngine,
    format: OutputFormat,
    interactive: bool,
}

impl Session {
    pub fn new(engine: PoolEngine, format: OutputFormat) -> Self {
        Self {
            engine,
            format,
            interactive: false,
        }
    }

    /// Print the pool status and a prompt before every line.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn engine(&self) -> &PoolEngine {
        &self.engine
    }

    /// Execute one instruction and return the lines to print.
    pub fn execute(&mut self, command: Command) -> CliResult<Vec<String>> {
        let outcome = match command {
            Command::Status => {
                return Ok(vec![render_status(&self.engine.status(), self.format)?]);
            }
            Command::Price { sell, buy } => {
                self.engine.set_oracle_price(sell, buy)?;
                let oracle = self.engine.oracle();
                Outcome::PriceSet {
                    sell: oracle.sell_price(),
                    buy: oracle.buy_price(),
                }
            }
            Command::Wait { secs } => {
                let now = self.engine.advance_time(secs)?;
                Outcome::TimeAdvanced { secs, now }
            }
            Command::Mint { holder, collateral } => {
                let stable_out = self.engine.mint(&holder, collateral)?;
                Outcome::Minted {
                    holder,
                    collateral_in: collateral,
                    stable_out,
                }
            }
            Command::Burn { holder, stable } => {
                let collateral_out = self.engine.burn(&holder, stable)?;
                Outcome::Burned {
                    holder,
                    stable_in: stable,
                    collateral_out,
                }
            }
            Command::FundFromCollateral { holder, collateral } => {
                let funding_out = self.engine.fund_from_collateral(&holder, collateral)?;
                Outcome::FundedFromCollateral {
                    holder,
                    collateral_in: collateral,
                    funding_out,
                }
            }
            Command::FundFromStable { holder, stable } => {
                let funding_out = self.engine.fund_from_stable_token(&holder, stable)?;
                Outcome::FundedFromStable {
                    holder,
                    stable_in: stable,
                    funding_out,
                }
            }
            Command::Redeem { holder, funding } => {
                let collateral_out = self.engine.redeem(&holder, funding)?;
                Outcome::Redeemed {
                    holder,
                    funding_in: funding,
                    collateral_out,
                }
            }
        };

        let mut lines = Vec::new();
        for event in self.engine.drain_events() {
            if let Some(line) = render_event(&event, self.format)? {
                lines.push(line);
            }
        }
        lines.push(render_outcome(&outcome, self.format)?);
        Ok(lines)
    }

    /// Process every line of `input`. Malformed or rejected instructions are
    /// reported on `err` and the run continues.
    pub fn run<R, W, E>(&mut self, input: R, out: &mut W, err: &mut E) -> CliResult<RunSummary>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut summary = RunSummary::default();
        self.prompt(out)?;

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let result = parse_line(&line).and_then(|command| match command {
                Some(command) => {
                    debug!(line = index + 1, command = command.keyword(), "Executing");
                    self.execute(command).map(Some)
                }
                None => Ok(None),
            });

            match result {
                Ok(Some(lines)) => {
                    summary.executed += 1;
                    for line in lines {
                        writeln!(out, "{}", line)?;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    summary.rejected += 1;
                    writeln!(err, "Error (line {}): {}", index + 1, e)?;
                }
            }
            self.prompt(out)?;
        }
        out.flush()?;
        Ok(summary)
    }

    fn prompt<W: Write>(&self, out: &mut W) -> CliResult<()> {
        if self.interactive {
            writeln!(out, "{}\n", render_status(&self.engine.status(), self.format)?)?;
            write!(out, "> ")?;
            out.flush()?;
        }
        Ok(())
    }
}
