//! visitgate Server Library
//!
//! Core functionality for the visitgate access service:
//! - `SQLite` storage for companies, users, blacklist, accesses and visits
//! - Access code generation and QR payloads
//! - Redemption with an atomic usage ceiling
//! - Lazy lifecycle maintenance (finalization and reminders)
//! - HTTP routes (axum)

pub mod code;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod routes;
pub mod services;
pub mod storage;
