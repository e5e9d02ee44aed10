//! Session-scoped pipeline context.
//!
//! One [`SessionContext`] owns everything derived from one uploaded file:
//! normalized records, derived records, usage stats, and diagnostics.
//! There is no global state; loading a new file means building a new
//! context and dropping the old one.

use chrono::NaiveDate;
use tracing::info;

use crate::aggregate::{self, GroupingSpec, Metric, PairCount, SummaryRow, SummaryTable};
use crate::derive::{DerivedRecord, PairingRules, derive_records};
use crate::error::IngestError;
use crate::parser::{Diagnostics, NormalizedRecord, normalize};
use crate::schema::LocationAliases;
use crate::stats::UsageStats;

/// Everything configurable about a session's pipeline run.
#[derive(Debug, Default)]
pub struct SessionConfig {
    pub aliases: LocationAliases,
    pub pairing: PairingRules,
}

/// The four data products of one processed file.
#[derive(Debug)]
pub struct SessionContext {
    normalized: Vec<NormalizedRecord>,
    derived: Vec<DerivedRecord>,
    stats: UsageStats,
    diagnostics: Diagnostics,
}

/// Record filter used by the explorer surface. All criteria are optional
/// and conjunctive.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub agency: Option<String>,
    /// Case-insensitive substring match on the location.
    pub location_contains: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SessionContext {
    /// Runs the full pipeline over one file's bytes.
    ///
    /// # Errors
    ///
    /// [`IngestError`] when the file as a whole is unusable (empty,
    /// headerless, or missing required columns). Row-level problems do
    /// not error; they land in [`SessionContext::diagnostics`].
    pub fn load(bytes: &[u8], config: &SessionConfig) -> Result<Self, IngestError> {
        let (normalized, diagnostics) = normalize(bytes, &config.aliases)?;
        let derived = derive_records(&normalized, &config.pairing);
        let stats = UsageStats::from_records(&derived);

        info!(
            processed = diagnostics.rows_processed,
            excluded = diagnostics.rows_excluded,
            stops = stats.unique_stops,
            "Session loaded"
        );

        Ok(SessionContext {
            normalized,
            derived,
            stats,
            diagnostics,
        })
    }

    pub fn normalized(&self) -> &[NormalizedRecord] {
        &self.normalized
    }

    pub fn derived(&self) -> &[DerivedRecord] {
        &self.derived
    }

    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Summary table for a grouping spec. Pure; safe to call repeatedly.
    pub fn summary(&self, spec: &GroupingSpec) -> SummaryTable {
        aggregate::summarize(&self.derived, spec)
    }

    /// The `n` largest groups under `metric` for a grouping spec.
    pub fn top(&self, spec: &GroupingSpec, metric: Metric, n: usize) -> Vec<SummaryRow> {
        let table = self.summary(spec);
        aggregate::top_n(&table, metric, n)
    }

    /// Most frequent inferred origin → destination sequences.
    pub fn pairs(&self, n: usize) -> Vec<PairCount> {
        let mut pairs = aggregate::pair_counts(&self.derived);
        pairs.truncate(n);
        pairs
    }

    /// Derived records matching `filter`, in timestamp order.
    pub fn filter_records(&self, filter: &RecordFilter) -> Vec<&DerivedRecord> {
        let needle = filter
            .location_contains
            .as_ref()
            .map(|s| s.to_lowercase());

        self.derived
            .iter()
            .filter(|r| {
                if let Some(agency) = &filter.agency {
                    if &r.record.agency != agency {
                        return false;
                    }
                }
                if let Some(from) = filter.from {
                    if r.date < from {
                        return false;
                    }
                }
                if let Some(to) = filter.to {
                    if r.date > to {
                        return false;
                    }
                }
                if let Some(needle) = &needle {
                    match &r.record.location {
                        Some(location) => {
                            if !location.to_lowercase().contains(needle) {
                                return false;
                            }
                        }
                        None => return false,
                    }
                }
                true
            })
            .collect()
    }
}
