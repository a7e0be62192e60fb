//! In-memory tabular store with per-collection version tokens.
//!
//! Every successful write bumps the collection version, which lets the
//! service detect concurrent writers when optimistic concurrency is enabled.
//! The store can also be switched offline to exercise failure paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{Row, StoreError, TabularStore, Versioned};

#[derive(Debug, Default)]
struct Collection {
    rows: Vec<Row>,
    version: u64,
}

#[derive(Debug)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    available: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of read calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn version(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.lock()?;
        Ok(collections.get(collection).map_or(0, |c| c.version))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn snapshot(&self, collection: &str) -> Result<Versioned<Vec<Row>>, StoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let collections = self.lock()?;
        Ok(match collections.get(collection) {
            Some(c) => Versioned {
                value: c.rows.clone(),
                version: Some(c.version),
            },
            None => Versioned {
                value: Vec::new(),
                version: Some(0),
            },
        })
    }

    fn replace(
        &self,
        collection: &str,
        rows: &[Row],
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.lock()?;
        let entry = collections.entry(collection.to_string()).or_default();

        if let Some(expected) = expected {
            if entry.version != expected {
                return Err(StoreError::VersionMismatch {
                    collection: collection.to_string(),
                    expected: Some(expected),
                    found: Some(entry.version),
                });
            }
        }

        entry.rows = rows.to_vec();
        entry.version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read(&self, collection: &str) -> Result<Vec<Row>, StoreError> {
        Ok(self.snapshot(collection)?.value)
    }

    async fn write(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.replace(collection, rows, None)
    }

    async fn read_versioned(&self, collection: &str) -> Result<Versioned<Vec<Row>>, StoreError> {
        self.snapshot(collection)
    }

    async fn write_if_version(
        &self,
        collection: &str,
        rows: &[Row],
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        self.replace(collection, rows, expected)
    }
}
