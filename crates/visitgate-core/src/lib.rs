//! visitgate Core Library
//!
//! Shared functionality for visitgate components:
//! - Access window evaluation in a fixed civil timezone
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and the database handle macro
//! - Common error types and tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod schedule;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use schedule::{CivilClock, Recurrence, Schedule};
