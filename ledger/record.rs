//! Rows and tables of the submission ledger.
//!
//! The ledger is a plain grid of strings with a header row, mirroring the shared
//! sheet it is stored in. A `LedgerRecord` is one submission merged with its
//! per-condition probabilities, laid out in the canonical column order.

use crate::normalize::Probability;
use crate::types::{Condition, Submission};
use crate::validate::ValidatedSubmission;

const IDENTITY_COLUMNS: [&str; 3] = ["Name", "Address", "ContactNumber"];

/// Canonical header: identity fields, every attribute, then one probability per
/// condition.
pub fn ledger_columns() -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .copied()
        .chain(Submission::ATTRIBUTES.iter().map(|a| a.ledger_column()))
        .chain(Condition::ALL.iter().map(|c| c.probability_column()))
        .map(str::to_string)
        .collect()
}

/// One submission and its results, ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    cells: Vec<(String, String)>,
}

impl LedgerRecord {
    /// Builds the row. A condition without a result (its model failed) is stored as
    /// an empty cell; probabilities keep full precision as fractions in [0, 1].
    pub fn new(
        submission: &ValidatedSubmission,
        predictions: &[(Condition, Option<Probability>)],
    ) -> Self {
        let mut cells = vec![
            ("Name".to_string(), submission.name.clone()),
            ("Address".to_string(), submission.address.clone()),
            ("ContactNumber".to_string(), submission.contact_number.clone()),
        ];
        for attribute in Submission::ATTRIBUTES {
            cells.push((attribute.ledger_column().to_string(), submission.cell(attribute)));
        }
        for condition in Condition::ALL {
            let value = predictions
                .iter()
                .find(|(c, _)| *c == condition)
                .and_then(|(_, p)| *p)
                .map(|p| p.value().to_string())
                .unwrap_or_default();
            cells.push((condition.probability_column().to_string(), value));
        }
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Lays the record out under `headers`. Headers the record does not know get
    /// an empty cell.
    pub fn row_for(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get(h).unwrap_or_default().to_string())
            .collect()
    }
}

/// The full contents of the ledger sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LedgerTable {
    /// An empty table carrying the canonical header.
    pub fn empty() -> Self {
        Self {
            headers: ledger_columns(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes rows in which every cell is blank.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|row| row.iter().any(|cell| !cell.trim().is_empty()));
        before - self.rows.len()
    }

    /// Makes the table carry every column in `columns` while keeping its own
    /// header order. Unknown columns are appended at the end and existing rows are
    /// padded, so no existing cell moves or disappears.
    ///
    /// Cells beyond the header width (a legacy row with extra values) are first
    /// given placeholder headers so the appended columns never claim them.
    pub fn conform_to(&mut self, columns: &[String]) {
        self.name_surplus_cells();
        if self.headers.is_empty() {
            self.headers = columns.to_vec();
        } else {
            for column in columns {
                if !self.headers.contains(column) {
                    self.headers.push(column.clone());
                }
            }
        }
        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
    }

    fn name_surplus_cells(&mut self) {
        let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut index = self.headers.len();
        while self.headers.len() < widest {
            index += 1;
            let placeholder = format!("Unnamed{index}");
            if !self.headers.contains(&placeholder) {
                self.headers.push(placeholder);
            }
        }
    }

    /// Cell lookup by row index and header name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}
