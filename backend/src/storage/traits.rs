//! # Storage Traits
//!
//! The tabular store abstraction the domain layer is written against.
//! A store holds named collections of rows and only supports whole
//! collection reads and whole collection overwrites.

use async_trait::async_trait;

use super::error::StoreError;
use super::row::Row;

/// A value read together with the collection version it was read at.
/// `version` is `None` for stores that do not track versions.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Option<u64>,
}

/// Named-collection row store
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read every row of a collection, in stored order
    async fn read(&self, collection: &str) -> Result<Vec<Row>, StoreError>;

    /// Replace the entire contents of a collection
    async fn write(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError>;

    /// Read a collection along with its version token
    async fn read_versioned(&self, collection: &str) -> Result<Versioned<Vec<Row>>, StoreError> {
        Ok(Versioned {
            value: self.read(collection).await?,
            version: None,
        })
    }

    /// Replace a collection only if it is still at `expected`.
    ///
    /// Fails with [`StoreError::VersionMismatch`] when another writer got
    /// there first. Stores without versions write unconditionally.
    async fn write_if_version(
        &self,
        collection: &str,
        rows: &[Row],
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        let _ = expected;
        self.write(collection, rows).await
    }
}
