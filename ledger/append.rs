//! # Ledger Appender
//!
//! Appending is a read-modify-write of the whole sheet: fetch the current table,
//! drop blank rows, add the new record at the end and write everything back.
//! Two unsynchronized appenders can both read the same snapshot and one of the
//! records is lost, so every append through a `Ledger` runs under one lock.
//! Writers in other processes are not covered by that lock.

use super::record::{LedgerRecord, LedgerTable, ledger_columns};
use super::store::{LedgerStore, StoreError};
use std::sync::Mutex;
use std::time::Duration;

/// What an append did to the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Non-blank rows present before the append.
    pub rows_before: usize,
    pub rows_after: usize,
    /// Blank rows removed while rewriting the sheet.
    pub dropped_empty: usize,
}

/// The shared ledger: a store plus the lock that serializes appends.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    read_ttl: Duration,
    append_lock: Mutex<()>,
}

/// Merges `record` into `existing`. An absent or header-less table is treated as
/// an empty table with the canonical header. Prior rows keep their order and
/// content.
pub fn merge(existing: Option<LedgerTable>, record: &LedgerRecord) -> (LedgerTable, usize) {
    let mut table = existing.unwrap_or_else(LedgerTable::empty);
    let dropped = table.drop_empty_rows();
    table.conform_to(&ledger_columns());
    let row = record.row_for(&table.headers);
    table.rows.push(row);
    (table, dropped)
}

impl<S: LedgerStore> Ledger<S> {
    /// `read_ttl` applies to plain reads; appends always fetch a fresh copy.
    pub fn new(store: S, read_ttl: Duration) -> Self {
        Self {
            store,
            read_ttl,
            append_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The current sheet, possibly from cache. A missing sheet is an empty table.
    pub fn read(&self) -> Result<LedgerTable, StoreError> {
        let mut table = self
            .store
            .read(self.read_ttl)?
            .unwrap_or_else(LedgerTable::empty);
        table.drop_empty_rows();
        Ok(table)
    }

    /// Appends one record and writes the whole sheet back.
    pub fn append(&self, record: &LedgerRecord) -> Result<AppendReceipt, StoreError> {
        let guard = self
            .append_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger append lock poisoned".to_string()))?;

        let existing = self.store.read(Duration::ZERO)?;
        let (table, dropped_empty) = merge(existing, record);
        let rows_after = table.len();

        self.store.write(&table)?;
        drop(guard);

        let receipt = AppendReceipt {
            rows_before: rows_after - 1,
            rows_after,
            dropped_empty,
        };
        log::info!(
            "Appended ledger row {} ({} blank rows dropped)",
            receipt.rows_after,
            receipt.dropped_empty
        );
        Ok(receipt)
    }
}
