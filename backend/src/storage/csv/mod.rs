//! # CSV Storage
//!
//! File-based tabular store. Each collection is a CSV file in the data
//! directory:
//!
//! ```text
//! Baby Tracker/
//! ├── tracker_config.yaml
//! ├── Repas.csv
//! ├── Changes.csv
//! ├── Sommeil.csv
//! └── ...
//! ```

pub mod connection;
pub mod csv_tabular_store;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use csv_tabular_store::CsvTabularStore;
