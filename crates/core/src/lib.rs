//! CareLink Core - Shared types library.
//!
//! This crate provides the domain types used across all CareLink components:
//! - `admin` - Coordinator dashboard (requests, volunteers, messages)
//! - `cli` - Command-line tools for migrations, accounts, and demo data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Listing and status rules live here so the
//! dashboard and the tests share one implementation.
//!
//! # Modules
//!
//! - [`types`] - Records, type-safe IDs, emails, and statuses
//! - [`listing`] - Filter, search, and pagination pipeline
//! - [`summary`] - Dashboard counters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod listing;
pub mod summary;
pub mod types;

pub use listing::{Page, Pagination, StatusFilter, VerificationFilter};
pub use summary::DashboardSummary;
pub use types::*;
