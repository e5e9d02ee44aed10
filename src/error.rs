//! Error taxonomy for the ingest and query layers.
//!
//! Row-level failures ([`RowError`]) only ever exclude the offending row;
//! file-level problems ([`IngestError`]) abort ingest with no partial
//! output; bad grouping requests ([`QueryError`]) are rejected before any
//! aggregation runs.

use thiserror::Error;

/// A whole input file was rejected.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input is empty or has no header row")]
    EmptyInput,
    #[error("missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("input is not readable as CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A single data row could not be normalized. The row is dropped and the
/// reason is surfaced through the diagnostics side channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("unparsable timestamp `{0}`")]
    BadTimestamp(String),
    #[error("unparsable amount `{0}`")]
    BadAmount(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("malformed row: {0}")]
    Malformed(String),
}

/// An aggregation request was invalid. Aggregation is never attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("grouping spec is empty")]
    EmptyGrouping,
    #[error("unknown grouping dimension `{0}`")]
    UnknownDimension(String),
    #[error("unknown ranking metric `{0}`")]
    UnknownMetric(String),
}
