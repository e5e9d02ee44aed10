//! Data types used by the aggregation pipeline.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::derive::DerivedRecord;
use crate::error::QueryError;

/// A grouping dimension. Dimension values are rendered as strings so that
/// group keys order lexicographically; numeric dimensions are zero-padded
/// to keep that order consistent with numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Agency,
    Location,
    DayOfWeek,
    HourOfDay,
    Month,
    Date,
}

impl Dimension {
    pub const ALL: &'static [Dimension] = &[
        Dimension::Agency,
        Dimension::Location,
        Dimension::DayOfWeek,
        Dimension::HourOfDay,
        Dimension::Month,
        Dimension::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Agency => "agency",
            Dimension::Location => "location",
            Dimension::DayOfWeek => "day_of_week",
            Dimension::HourOfDay => "hour_of_day",
            Dimension::Month => "month",
            Dimension::Date => "date",
        }
    }

    /// The record's value for this dimension, or `None` when the record
    /// does not carry it (a record without a stop has no location).
    pub fn value_of(self, record: &DerivedRecord) -> Option<String> {
        match self {
            Dimension::Agency => Some(record.record.agency.clone()),
            Dimension::Location => record.record.location.clone(),
            Dimension::DayOfWeek => Some(record.day_of_week.to_string()),
            Dimension::HourOfDay => Some(format!("{:02}", record.hour_of_day)),
            Dimension::Month => Some(record.month.clone()),
            Dimension::Date => Some(record.date.to_string()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| QueryError::UnknownDimension(s.trim().to_string()))
    }
}

/// An ordered, validated, non-empty list of grouping dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingSpec(Vec<Dimension>);

impl GroupingSpec {
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, QueryError> {
        if dimensions.is_empty() {
            return Err(QueryError::EmptyGrouping);
        }
        Ok(GroupingSpec(dimensions))
    }

    /// Parses a comma-separated dimension list, e.g. `"agency,location"`.
    pub fn parse(spec: &str) -> Result<Self, QueryError> {
        let dimensions = spec
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Dimension::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        GroupingSpec::new(dimensions)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.0
    }
}

/// A per-group aggregate the output can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Count,
    AmountSum,
    SpendTotal,
    ReloadCount,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Count => "count",
            Metric::AmountSum => "amount_sum",
            Metric::SpendTotal => "spend_total",
            Metric::ReloadCount => "reload_count",
        }
    }

    pub fn value_of(self, row: &SummaryRow) -> Decimal {
        match self {
            Metric::Count => Decimal::from(row.count),
            Metric::AmountSum => row.amount_sum,
            Metric::SpendTotal => row.spend_total,
            Metric::ReloadCount => Decimal::from(row.reload_count),
        }
    }
}

impl FromStr for Metric {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "count" => Ok(Metric::Count),
            "amount_sum" => Ok(Metric::AmountSum),
            "spend_total" => Ok(Metric::SpendTotal),
            "reload_count" => Ok(Metric::ReloadCount),
            other => Err(QueryError::UnknownMetric(other.to_string())),
        }
    }
}

/// One group's aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Dimension values in spec order.
    pub key: Vec<String>,
    pub count: u64,
    /// Signed sum over the group.
    pub amount_sum: Decimal,
    /// Sum of |amount| over spend records only.
    pub spend_total: Decimal,
    /// Number of reload events (amount > 0).
    pub reload_count: u64,
    pub amount_mean: Decimal,
}

/// Aggregation output: rows in ascending group-key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub dimensions: Vec<Dimension>,
    pub rows: Vec<SummaryRow>,
    /// Records skipped because a requested dimension value was absent.
    pub skipped: usize,
}

/// Frequency of one inferred origin → destination sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCount {
    pub origin: String,
    pub destination: String,
    pub count: u64,
}
