//! TTL read cache in front of a tabular store.
//!
//! Plain reads within `ttl` of the last fetch are served from memory. Any
//! write drops the cached copy of that collection. Versioned reads always go
//! to the backing store so a compare-and-swap never works from stale data.

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Row, StoreError, TabularStore, Versioned};

/// How long reads may be served from cache. A zero ttl disables caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn disabled() -> Self {
        Self { ttl: Duration::ZERO }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }
}

#[derive(Debug)]
struct CacheEntry {
    rows: Vec<Row>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    policy: CachePolicy,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<S: TabularStore> CachedStore<S> {
    pub fn new(inner: S, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("cache lock poisoned".to_string()))
    }

    fn cached(&self, collection: &str) -> Result<Option<Vec<Row>>, StoreError> {
        if !self.policy.is_enabled() {
            return Ok(None);
        }
        let entries = self.lock()?;
        Ok(entries
            .get(collection)
            .filter(|entry| entry.fetched_at.elapsed() < self.policy.ttl)
            .map(|entry| entry.rows.clone()))
    }

    fn remember(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError> {
        if self.policy.is_enabled() {
            self.lock()?.insert(
                collection.to_string(),
                CacheEntry {
                    rows: rows.to_vec(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(())
    }

    fn invalidate(&self, collection: &str) -> Result<(), StoreError> {
        self.lock()?.remove(collection);
        Ok(())
    }
}

#[async_trait]
impl<S: TabularStore> TabularStore for CachedStore<S> {
    async fn read(&self, collection: &str) -> Result<Vec<Row>, StoreError> {
        if let Some(rows) = self.cached(collection)? {
            debug!("Serving collection '{}' from cache", collection);
            return Ok(rows);
        }

        let rows = self.inner.read(collection).await?;
        self.remember(collection, &rows)?;
        Ok(rows)
    }

    async fn write(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.invalidate(collection)?;
        self.inner.write(collection, rows).await
    }

    async fn read_versioned(&self, collection: &str) -> Result<Versioned<Vec<Row>>, StoreError> {
        let snapshot = self.inner.read_versioned(collection).await?;
        self.remember(collection, &snapshot.value)?;
        Ok(snapshot)
    }

    async fn write_if_version(
        &self,
        collection: &str,
        rows: &[Row],
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        self.invalidate(collection)?;
        self.inner.write_if_version(collection, rows, expected).await
    }
}
