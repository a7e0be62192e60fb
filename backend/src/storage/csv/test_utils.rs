//! Test utilities for the CSV store
//!
//! Each test environment lives in its own temporary directory that is
//! removed when the environment is dropped, even if the test panics.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::connection::CsvConnection;
use super::csv_tabular_store::CsvTabularStore;

pub struct TestEnvironment {
    /// Kept alive so the directory survives until drop
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("baby_tracker_test_")?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    pub fn store(&self) -> CsvTabularStore {
        CsvTabularStore::new(self.connection.clone())
    }

    pub fn read_collection_file(&self, collection: &str) -> String {
        fs::read_to_string(self.base_path.join(format!("{}.csv", collection)))
            .expect("collection file should exist")
    }

    pub fn write_collection_file(&self, collection: &str, contents: &str) {
        fs::write(self.base_path.join(format!("{}.csv", collection)), contents)
            .expect("failed to seed collection file");
    }
}
