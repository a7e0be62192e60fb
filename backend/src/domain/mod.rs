//! # Domain Module
//!
//! Business logic of the activity log, independent of any storage backend.
//!
//! ## Module Organization
//!
//! - **activity_log_service**: append, remove last, time since last, recent entries
//! - **validation**: per-category input checks and record normalization
//! - **row_mapper**: records to store rows and back
//! - **elapsed**: date/time parsing and elapsed time arithmetic
//! - **policy**: behaviour switches (overnight spans, concurrency, >24h display)
//!
//! ## Rules
//!
//! - Records are only ever appended; the only removal is of the last one
//! - Duplicate date/time entries are allowed
//! - Sleep and daycare durations are computed once, when the record is created
//! - "Last" always means last appended, never latest by date

pub mod activity_log_service;
pub mod elapsed;
pub mod policy;
pub mod row_mapper;
pub mod validation;

pub use activity_log_service::*;
pub use policy::*;
pub use row_mapper::RowMapper;
pub use validation::*;
