//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use chrono::{DateTime, NaiveDate, Utc};

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod catalog;
pub mod incident;
pub mod init;
pub mod payroll;
pub mod rate;
pub mod skill;
pub mod test;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Catalog(args) => catalog::run(ctx, args),
        Commands::Test(args) => test::run(ctx, args),
        Commands::Skill(args) => skill::run(ctx, args),
        Commands::Incident(args) => incident::run(ctx, args),
        Commands::Rate(args) => rate::run(ctx, args),
        Commands::Payroll(args) => payroll::run(ctx, args),
    }
}

/// `--at` value, defaulting to the current instant.
pub(crate) fn instant(at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    at.unwrap_or_else(Utc::now)
}

/// `--date` value, defaulting to today (UTC).
pub(crate) fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}
