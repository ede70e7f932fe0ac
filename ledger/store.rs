//! # Ledger Storage Boundary
//!
//! The store behaves like a remote sheet: it can hand back the whole table and
//! accept a whole table, with no row-level addressing. Reads may be served from a
//! short-lived cache (`ttl`), the way a sheet connection caches its last fetch.
//!
//! `CsvSheetStore` keeps one sheet per file and replaces it atomically: the new
//! table is written to a temporary file in the same directory and renamed over
//! the old one, so a reader sees either the previous or the next table.

use super::record::LedgerTable;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Ledger sheet '{path}' could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Ledger sheet '{path}' is not valid CSV: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Ledger store is unavailable: {0}")]
    Unavailable(String),
}

/// A single shared table with whole-table read and write.
pub trait LedgerStore: Send + Sync {
    /// Returns the current table, or `None` when the sheet does not exist yet.
    /// A cached copy younger than `ttl` may be returned.
    fn read(&self, ttl: Duration) -> Result<Option<LedgerTable>, StoreError>;

    /// Replaces the whole table.
    fn write(&self, table: &LedgerTable) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct CachedSheet {
    fetched_at: Instant,
    table: Option<LedgerTable>,
}

/// A sheet stored as `<directory>/<worksheet>.csv`.
#[derive(Debug)]
pub struct CsvSheetStore {
    path: PathBuf,
    cache: Mutex<Option<CachedSheet>>,
}

impl CsvSheetStore {
    pub fn new(directory: &Path, worksheet: &str) -> Self {
        Self::at_path(directory.join(format!("{worksheet}.csv")))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn read_from_disk(&self) -> Result<Option<LedgerTable>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() < headers.len() {
                row.resize(headers.len(), String::new());
            }
            rows.push(row);
        }

        Ok(Some(LedgerTable { headers, rows }))
    }

    fn write_to_disk(&self, table: &LedgerTable) -> Result<(), StoreError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory).map_err(|e| self.io_error(e))?;

        let staging = NamedTempFile::new_in(&directory).map_err(|e| self.io_error(e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(staging.as_file());
            writer
                .write_record(&table.headers)
                .map_err(|e| self.csv_error(e))?;
            for row in &table.rows {
                writer.write_record(row).map_err(|e| self.csv_error(e))?;
            }
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        staging
            .as_file()
            .sync_all()
            .map_err(|e| self.io_error(e))?;
        staging
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl LedgerStore for CsvSheetStore {
    fn read(&self, ttl: Duration) -> Result<Option<LedgerTable>, StoreError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| StoreError::Unavailable("sheet cache lock poisoned".to_string()))?;

        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < ttl {
                log::debug!("Serving ledger sheet '{}' from cache", self.path.display());
                return Ok(cached.table.clone());
            }
        }

        let table = self.read_from_disk()?;
        log::debug!(
            "Fetched ledger sheet '{}' ({} rows)",
            self.path.display(),
            table.as_ref().map_or(0, LedgerTable::len)
        );
        *cache = Some(CachedSheet {
            fetched_at: Instant::now(),
            table: table.clone(),
        });
        Ok(table)
    }

    fn write(&self, table: &LedgerTable) -> Result<(), StoreError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| StoreError::Unavailable("sheet cache lock poisoned".to_string()))?;
        self.write_to_disk(table)?;
        // The cache now mirrors what was written so the next read never sees the
        // pre-write snapshot.
        *cache = Some(CachedSheet {
            fetched_at: Instant::now(),
            table: Some(table.clone()),
        });
        Ok(())
    }
}

/// An in-process sheet. Useful for tests and for embedding without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Option<LedgerTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: LedgerTable) -> Self {
        Self {
            table: Mutex::new(Some(table)),
        }
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Option<LedgerTable> {
        self.table.lock().ok().and_then(|guard| guard.clone())
    }
}

impl LedgerStore for MemoryStore {
    fn read(&self, _: Duration) -> Result<Option<LedgerTable>, StoreError> {
        self.table
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::Unavailable("memory sheet lock poisoned".to_string()))
    }

    fn write(&self, table: &LedgerTable) -> Result<(), StoreError> {
        let mut guard = self
            .table
            .lock()
            .map_err(|_| StoreError::Unavailable("memory sheet lock poisoned".to_string()))?;
        *guard = Some(table.clone());
        Ok(())
    }
}
