//! # Baby Tracker Backend
//!
//! Non-UI logic of the baby care activity log.
//!
//! ## Architecture
//!
//! ```text
//! Presentation (dashboard, forms)
//!     ↓
//! Domain Layer (ActivityLogService, validation, elapsed time)
//!     ↓
//! Storage Layer (TabularStore: CSV files, memory, TTL cache)
//! ```
//!
//! The store is injected into the service; nothing here holds global state.

pub mod config;
pub mod domain;
pub mod storage;

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::domain::ActivityLogService;
use crate::storage::{CachedStore, CsvConnection, CsvTabularStore};

pub type CsvActivityLog = ActivityLogService<CachedStore<CsvTabularStore>>;

/// Application state holding the configured services
#[derive(Clone)]
pub struct AppState {
    pub config: TrackerConfig,
    pub activity_log: CsvActivityLog,
}

/// Initialize the backend on a data directory, or the default one when `None`
pub fn initialize_backend(data_directory: Option<&Path>) -> Result<AppState> {
    info!("Setting up CSV storage");
    let connection = match data_directory {
        Some(dir) => CsvConnection::new(dir)?,
        None => CsvConnection::new_default()?,
    };
    info!("Data directory: {}", connection.base_directory().display());

    let config = TrackerConfig::load_or_create(connection.base_directory())?;

    info!("Setting up activity log");
    let store = CachedStore::new(CsvTabularStore::new(connection), config.cache_policy());
    let activity_log = ActivityLogService::new(Arc::new(store), config.log_policy());

    Ok(AppState {
        config,
        activity_log,
    })
}
