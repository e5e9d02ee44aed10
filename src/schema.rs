//! The column contract of the card provider's CSV export.
//!
//! Columns are resolved by header name, not position, so exports with
//! extra columns (`Balance`, `Service Class`, ...) or reordered columns
//! still load.

use anyhow::Result;
use std::collections::HashMap;

use crate::error::IngestError;

pub const COL_DATE: &str = "Date";
pub const COL_AGENCY: &str = "Transit Agency";
pub const COL_LOCATION: &str = "Location";
pub const COL_TYPE: &str = "Type";
pub const COL_AMOUNT: &str = "Amount";

/// Every column the normalizer reads. Anything else in the export is ignored.
pub const REQUIRED_COLUMNS: &[&str] = &[COL_DATE, COL_AGENCY, COL_LOCATION, COL_TYPE, COL_AMOUNT];

/// Resolved indices of the required columns within one file's header row.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    pub date: usize,
    pub agency: usize,
    pub location: usize,
    pub kind: usize,
    pub amount: usize,
}

impl ColumnMap {
    /// Resolves the required columns against a header row.
    ///
    /// # Errors
    ///
    /// [`IngestError::EmptyInput`] when the header row is blank, and
    /// [`IngestError::MissingColumns`] naming every absent column.
    pub fn from_headers(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::EmptyInput);
        }

        let index_of = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| index_of(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        Ok(ColumnMap {
            date: index_of(COL_DATE).unwrap(),
            agency: index_of(COL_AGENCY).unwrap(),
            location: index_of(COL_LOCATION).unwrap(),
            kind: index_of(COL_TYPE).unwrap(),
            amount: index_of(COL_AMOUNT).unwrap(),
        })
    }
}

/// Maps raw location labels to display names.
///
/// Some providers encode stops as fare zones (`Zone17`) rather than stop
/// names. Stored as a plain JSON object on disk:
/// ```json
/// {
///   "Zone17": "Aldershot GO",
///   "Zone20": "Square One"
/// }
/// ```
#[derive(Debug, Default)]
pub struct LocationAliases {
    entries: HashMap<String, String>,
}

impl LocationAliases {
    /// Loads the alias map from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self { entries })
    }

    /// Returns the display name for `raw`, or `raw` itself when no alias
    /// is configured.
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.entries.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
