//! Record normalizer for transit-card CSV exports.
//!
//! Turns raw CSV bytes into timestamp-ordered [`NormalizedRecord`]s.
//! Malformed rows never abort the batch: they are excluded, counted, and
//! sampled into [`Diagnostics`] for user-visible data-quality reporting.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{IngestError, RowError};
use crate::schema::{ColumnMap, LocationAliases};

/// Timestamp formats accepted in the `Date` column. The provider exports
/// 12-hour US-style stamps; the ISO variants cover re-exported files.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// How many row failures are kept verbatim for diagnostics.
const FAILURE_SAMPLE_CAP: usize = 10;

/// One validated transaction. Maps one-to-one to a source row that passed
/// validation; `trip_id` is assigned from the final timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub trip_id: u64,
    pub timestamp: NaiveDateTime,
    pub agency: String,
    /// Absent for transaction types with no stop (online reloads, fees).
    pub location: Option<String>,
    /// The provider's transaction-type label, verbatim.
    pub type_label: String,
    /// Signed: negative = spend, positive = reload.
    pub amount: Decimal,
}

/// Per-file ingest accounting, always available to the user regardless of
/// how many rows survived.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub rows_processed: usize,
    pub rows_excluded: usize,
    pub failure_samples: Vec<FailureSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSample {
    /// 1-based data row number (header not counted).
    pub row: usize,
    pub reason: String,
}

impl Diagnostics {
    fn exclude(&mut self, row: usize, err: &RowError) {
        self.rows_excluded += 1;
        if self.failure_samples.len() < FAILURE_SAMPLE_CAP {
            self.failure_samples.push(FailureSample {
                row,
                reason: err.to_string(),
            });
        }
    }
}

/// Parses and validates a whole export.
///
/// Returns the surviving records sorted by timestamp ascending (source
/// order preserved for equal timestamps) together with the diagnostics.
///
/// # Errors
///
/// [`IngestError`] for file-level problems only: empty input, a missing
/// header row, or required columns absent. A header row with zero data
/// rows is valid and yields empty output.
pub fn normalize(
    bytes: &[u8],
    aliases: &LocationAliases,
) -> Result<(Vec<NormalizedRecord>, Diagnostics), IngestError> {
    let mut rdr = csv::Reader::from_reader(bytes);

    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut diagnostics = Diagnostics::default();

    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let parsed = result
            .map_err(|e| RowError::Malformed(e.to_string()))
            .and_then(|record| parse_row(&record, &columns, aliases));

        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(row, error = %e, "Row excluded");
                diagnostics.exclude(row, &e);
            }
        }
    }

    // Stable: source order is the tie-break for equal timestamps, which
    // keeps trip_id assignment deterministic.
    records.sort_by_key(|r| r.timestamp);
    for (i, record) in records.iter_mut().enumerate() {
        record.trip_id = i as u64;
    }

    diagnostics.rows_processed = records.len();
    debug!(
        processed = diagnostics.rows_processed,
        excluded = diagnostics.rows_excluded,
        "Normalization complete"
    );

    Ok((records, diagnostics))
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    aliases: &LocationAliases,
) -> Result<NormalizedRecord, RowError> {
    let field = |idx: usize, name: &'static str| -> Result<&str, RowError> {
        record
            .get(idx)
            .map(str::trim)
            .ok_or(RowError::MissingField(name))
    };

    let timestamp = parse_timestamp(field(columns.date, "Date")?)?;

    let agency = field(columns.agency, "Transit Agency")?;
    if agency.is_empty() {
        return Err(RowError::MissingField("Transit Agency"));
    }

    let location = field(columns.location, "Location")?;
    let location = if location.is_empty() {
        None
    } else {
        Some(aliases.resolve(location).to_string())
    };

    let type_label = field(columns.kind, "Type")?.to_string();
    let amount = parse_amount(field(columns.amount, "Amount")?)?;

    Ok(NormalizedRecord {
        trip_id: 0, // assigned after the sort
        timestamp,
        agency: agency.to_string(),
        location,
        type_label,
        amount,
    })
}

/// Tries each accepted format in order.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, RowError> {
    if raw.is_empty() {
        return Err(RowError::MissingField("Date"));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| RowError::BadTimestamp(raw.to_string()))
}

/// Coerces provider currency formatting into a signed [`Decimal`].
///
/// Strips currency symbols and thousands separators; accepts accounting
/// negatives (`(3.25)`) as well as a leading sign on either side of the
/// currency symbol.
fn parse_amount(raw: &str) -> Result<Decimal, RowError> {
    if raw.is_empty() {
        return Err(RowError::MissingField("Amount"));
    }

    let mut s = raw.trim();
    let parenthesized = s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = &s[1..s.len() - 1];
    }

    let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();

    let value = Decimal::from_str(&cleaned).map_err(|_| RowError::BadAmount(raw.to_string()))?;

    Ok(if parenthesized { -value } else { value })
}
