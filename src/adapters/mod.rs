//! Infrastructure adapters. Implement outbound ports and the terminal front end.
//!
//! SQLite, in-memory store, CSV export, UI. Map errors to DomainError.

pub mod persistence;
pub mod report;
pub mod ui;
