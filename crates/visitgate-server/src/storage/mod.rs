//! `SQLite` storage for the visitgate server.
//!
//! Provides persistence for companies, users, blacklist entries, access
//! permits with their invited guests, and visits.

mod db;
mod models;
mod queries_access;
mod queries_lifecycle;
mod queries_tenancy;
mod queries_visits;


pub use db::{AccessDatabase, DatabaseError};
pub use models::*;
pub use queries_access::{AccessParams, RedemptionWrite};
pub use queries_tenancy::BlacklistParams;
