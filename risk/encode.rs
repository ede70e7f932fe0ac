//! # Categorical Feature Encoding
//!
//! Maps the human-readable answers collected by the form ("Never smoked",
//! "Above Normal") onto the integer codes a particular model was trained with.
//!
//! An encoding table belongs to exactly one condition's model contract. Two models
//! may legitimately disagree on the code of the same label, so tables are never
//! merged into a shared map and a lookup never guesses: an unknown label is an
//! error the caller has to handle.

use std::fmt;
use thiserror::Error;

/// An immutable label -> code table, scoped to one condition's model.
#[derive(Debug, PartialEq, Eq)]
pub struct EncodingTable {
    name: &'static str,
    entries: &'static [(&'static str, i64)],
}

/// Raised when a label is not one of the keys the model was trained on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{label}' is not a recognised {table} value (expected one of: {})", .expected.join(", "))]
pub struct EncodingLookupError {
    pub table: &'static str,
    pub label: String,
    pub expected: Vec<&'static str>,
}

impl EncodingTable {
    pub const fn new(name: &'static str, entries: &'static [(&'static str, i64)]) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The accepted labels, in the order the form should offer them.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|&(label, _)| label)
    }
}

impl fmt::Display for EncodingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (i, (label, code)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {label}: {code}")?;
        }
        f.write_str(" }")
    }
}

/// Encodes `label` with `table`. Matching is exact; no case folding or trimming is
/// applied because the labels come from a fixed selection list.
pub fn encode(label: &str, table: &EncodingTable) -> Result<i64, EncodingLookupError> {
    table
        .entries
        .iter()
        .find(|&&(key, _)| key == label)
        .map(|&(_, code)| code)
        .ok_or_else(|| EncodingLookupError {
            table: table.name(),
            label: label.to_string(),
            expected: table.labels().collect(),
        })
}
