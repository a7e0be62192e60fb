use async_trait::async_trait;
use csv::{ReaderBuilder, Writer};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};

use super::connection::CsvConnection;
use crate::storage::{Row, StoreError, TabularStore};

/// CSV-based tabular store: one file per collection, header row first.
///
/// A collection whose file does not exist yet reads as empty. Writes go to
/// a temporary file that is then renamed over the collection file.
#[derive(Debug, Clone)]
pub struct CsvTabularStore {
    connection: CsvConnection,
}

impl CsvTabularStore {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &CsvConnection {
        &self.connection
    }

    /// Columns of all rows in first-seen order
    fn header_for(rows: &[Row]) -> Vec<String> {
        let mut header: Vec<String> = Vec::new();
        for row in rows {
            for column in row.columns() {
                if !header.iter().any(|c| c == column) {
                    header.push(column.to_string());
                }
            }
        }
        header
    }
}

#[async_trait]
impl TabularStore for CsvTabularStore {
    async fn read(&self, collection: &str) -> Result<Vec<Row>, StoreError> {
        let file_path = self.connection.collection_file_path(collection)?;

        let file = match File::open(&file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Collection '{}' has no file yet, reading as empty", collection);
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(collection, e)),
        };

        let mut csv_reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = csv_reader
            .headers()
            .map_err(|e| StoreError::csv(collection, e))?
            .clone();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| StoreError::csv(collection, e))?;
            let row: Row = headers.iter().zip(record.iter()).collect();
            rows.push(row);
        }

        debug!("Read {} rows from collection '{}'", rows.len(), collection);
        Ok(rows)
    }

    async fn write(&self, collection: &str, rows: &[Row]) -> Result<(), StoreError> {
        let file_path = self.connection.collection_file_path(collection)?;
        let temp_path = file_path.with_extension("tmp");
        let header = Self::header_for(rows);

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StoreError::io(collection, e))?;

            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            if !header.is_empty() {
                csv_writer
                    .write_record(&header)
                    .map_err(|e| StoreError::csv(collection, e))?;
            }

            for row in rows {
                let record: Vec<&str> = header
                    .iter()
                    .map(|column| row.get(column).unwrap_or(""))
                    .collect();
                csv_writer
                    .write_record(&record)
                    .map_err(|e| StoreError::csv(collection, e))?;
            }

            csv_writer
                .flush()
                .map_err(|e| StoreError::io(collection, e))?;
        }

        std::fs::rename(&temp_path, &file_path).map_err(|e| StoreError::io(collection, e))?;

        info!("Wrote {} rows to collection '{}'", rows.len(), collection);
        Ok(())
    }
}
