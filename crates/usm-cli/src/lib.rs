//! USM pool simulator
//!
//! Reads one instruction per line (from a script or stdin), applies it to a
//! [`usm_core::PoolEngine`], and prints the outcome, any solvency-floor
//! notices, and pool snapshots on request.

pub mod command;
pub mod error;
pub mod output;
pub mod session;

pub use command::{parse_line, Command};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Outcome};
pub use session::{RunSummary, Session};
