//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// skillpay - skill qualification workflow and hourly rate calculation
#[derive(Parser, Debug)]
#[command(name = "skillpay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON for machine consumption (errors as structured JSON)
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/skillpay/config.toml, then <root>/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding catalog.toml and the database (default: current directory)
    #[arg(long, global = true, env = "SKILLPAY_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective data directory.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create config, sample catalog and database in the data directory
    Init(commands::init::InitArgs),

    /// List skills, tests and checklist templates
    Catalog(commands::catalog::CatalogArgs),

    /// Record theory test results and inspect cooldowns
    Test(commands::test::TestArgs),

    /// Drive a worker's skill qualification
    Skill(commands::skill::SkillArgs),

    /// Report and inspect quality incidents
    Incident(commands::incident::IncidentArgs),

    /// Calculate one worker's hourly rate
    Rate(commands::rate::RateArgs),

    /// Calculate hourly rates for every worker on a payroll sheet
    Payroll(commands::payroll::PayrollArgs),
}
