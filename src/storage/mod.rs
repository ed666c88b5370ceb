//! Storage layer for skillpay
//!
//! A single SQLite file holds the append-only attempt and incident ledgers
//! and the mutable qualification records. Every read-modify-write goes
//! through one immediate transaction.

pub mod attempts;
pub mod incidents;
pub mod migrations;
pub mod qualifications;
pub mod sqlite;

pub use sqlite::Database;
