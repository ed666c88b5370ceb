pub mod app;
pub mod attempts;
pub mod calendar;
pub mod catalog;
pub mod cli;
pub mod compensation;
pub mod config;
pub mod error;
pub mod incidents;
pub mod qualification;
pub mod storage;

pub use error::{PayError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
