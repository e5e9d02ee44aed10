//! Output formatting for session results.
//!
//! Supports pretty-printing, JSON serialization, and writing summary
//! tables as CSV files.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::SummaryTable;
use crate::stats::UsageStats;

/// Logs usage statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &UsageStats) {
    debug!("{:#?}", stats);
}

/// Logs any serializable result as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a [`SummaryTable`] as a CSV file at `path`.
///
/// The header carries the dimension names followed by the aggregate
/// columns. Tables are recomputed wholesale, so the file is overwritten
/// rather than appended.
pub fn write_summary_csv(path: &str, table: &SummaryTable) -> Result<()> {
    debug!(path, groups = table.rows.len(), "Writing summary CSV");

    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = table
        .dimensions
        .iter()
        .map(|d| d.as_str().to_string())
        .collect();
    header.extend(
        ["count", "amount_sum", "spend_total", "reload_count", "amount_mean"]
            .map(str::to_string),
    );
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut fields = row.key.clone();
        fields.push(row.count.to_string());
        fields.push(row.amount_sum.to_string());
        fields.push(row.spend_total.to_string());
        fields.push(row.reload_count.to_string());
        fields.push(row.amount_mean.to_string());
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{GroupingSpec, summarize};
    use crate::derive::{PairingRules, derive_records};
    use crate::schema::LocationAliases;
    use std::fs;

    fn sample_table() -> SummaryTable {
        let csv = "\
Date,Transit Agency,Location,Type,Amount,Balance
01/01/2024 08:00:00 AM,AgencyA,StopX,Fare Payment,-$3.25,$20.00
01/01/2024 08:30:00 AM,AgencyA,StopY,Fare Payment,-$2.75,$17.25
";
        let (records, _) =
            crate::parser::normalize(csv.as_bytes(), &LocationAliases::default()).unwrap();
        let derived = derive_records(&records, &PairingRules::default());
        summarize(&derived, &GroupingSpec::parse("location").unwrap())
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let stats = UsageStats::default();
        print_pretty(&stats);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let stats = UsageStats::default();
        print_json(&stats).unwrap();
    }

    #[test]
    fn test_write_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("by_location.csv");
        let path = path.to_str().unwrap();

        write_summary_csv(path, &sample_table()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "location,count,amount_sum,spend_total,reload_count,amount_mean"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("StopX,1,-3.25,3.25,0,"));
    }

    #[test]
    fn test_write_summary_csv_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let path = path.to_str().unwrap();

        write_summary_csv(path, &sample_table()).unwrap();
        write_summary_csv(path, &sample_table()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        // Header appears exactly once: the file is replaced, not appended.
        let header_count = content.lines().filter(|l| l.starts_with("location,")).count();
        assert_eq!(header_count, 1);
    }
}
