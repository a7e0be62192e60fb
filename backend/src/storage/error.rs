use thiserror::Error;

/// Failures of the tabular store. These are always surfaced to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid collection name: '{0}'")]
    InvalidCollection(String),

    #[error("I/O error on collection '{collection}': {source}")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on collection '{collection}': {source}")]
    Csv {
        collection: String,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row {index} in collection '{collection}': {reason}")]
    MalformedRow {
        collection: String,
        index: usize,
        reason: String,
    },

    #[error("Collection '{collection}' is at version {found:?}, expected {expected:?}")]
    VersionMismatch {
        collection: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("Collection '{collection}' kept changing, gave up after {attempts} attempts")]
    Conflict { collection: String, attempts: u32 },
}

impl StoreError {
    pub fn io(collection: &str, source: std::io::Error) -> Self {
        StoreError::Io {
            collection: collection.to_string(),
            source,
        }
    }

    pub fn csv(collection: &str, source: csv::Error) -> Self {
        StoreError::Csv {
            collection: collection.to_string(),
            source,
        }
    }
}
