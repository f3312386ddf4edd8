//! Core business logic - storage-agnostic operations over the [`Repository`] contract.
//!
//! [`Repository`]: crate::repository::Repository

/// CFP aggregation over parts trees and trades
pub mod aggregate;
/// CFP set registration, update and certificates
pub mod cfp;
/// Parts structure registration, lookup and removal
pub mod parts;
/// Request status listing and counting
pub mod status;
/// Trade requests, responses and state transitions
pub mod trade;
/// Input validation rules shared by the write paths
pub mod validate;
