//! Grouping and summary statistics over derived records.
//!
//! This module groups records by configurable dimension tuples, computes
//! per-group aggregates, and answers top-N and trip-pair frequency
//! queries. Everything here is a pure function of its inputs.

pub mod summarize;
pub mod types;
pub mod utility;

pub use summarize::{pair_counts, summarize, top_n};
pub use types::{Dimension, GroupingSpec, Metric, PairCount, SummaryRow, SummaryTable};
