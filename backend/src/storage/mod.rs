//! # Storage Module
//!
//! Persistence for the activity log. Every category lives in one named
//! collection of a tabular store, and the store only knows how to read a
//! whole collection and replace a whole collection.
//!
//! ## Implementations
//!
//! - **CSV**: one `<collection>.csv` file per collection in a data directory
//! - **Memory**: in-process collections with version tokens, used by tests
//! - **Cached**: wraps any store with a TTL read cache
//!
//! The domain layer depends on the [`TabularStore`] trait only, so a hosted
//! spreadsheet backend can be plugged in without touching the service.

pub mod cached;
pub mod csv;
pub mod error;
pub mod memory;
pub mod row;
pub mod traits;

pub use cached::{CachePolicy, CachedStore};
pub use self::csv::{CsvConnection, CsvTabularStore};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use row::Row;
pub use traits::{TabularStore, Versioned};
