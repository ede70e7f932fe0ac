pub mod append;
pub mod record;
pub mod store;
pub use append::{AppendReceipt, Ledger};
pub use record::{LedgerRecord, LedgerTable, ledger_columns};
pub use store::{CsvSheetStore, LedgerStore, MemoryStore, StoreError};
