//! The grouping fold and ranking queries.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::aggregate::types::{GroupingSpec, Metric, PairCount, SummaryRow, SummaryTable};
use crate::aggregate::utility::mean;
use crate::derive::DerivedRecord;

#[derive(Default)]
struct Accumulator {
    count: u64,
    amount_sum: Decimal,
    spend_total: Decimal,
    reload_count: u64,
}

impl Accumulator {
    fn push(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount_sum += amount;
        if amount < Decimal::ZERO {
            self.spend_total += -amount;
        } else if amount > Decimal::ZERO {
            self.reload_count += 1;
        }
    }
}

/// Groups records by the spec's dimension tuple and computes per-group
/// aggregates.
///
/// Records lacking a value for a requested dimension (no location) are
/// skipped and counted on the table; combinations with no records are
/// simply absent. Rows come back in ascending key order, so identical
/// inputs always produce an identical table.
pub fn summarize(records: &[DerivedRecord], spec: &GroupingSpec) -> SummaryTable {
    let mut groups: BTreeMap<Vec<String>, Accumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records {
        let key: Option<Vec<String>> = spec
            .dimensions()
            .iter()
            .map(|d| d.value_of(record))
            .collect();

        match key {
            Some(key) => groups.entry(key).or_default().push(record.record.amount),
            None => skipped += 1,
        }
    }

    let rows = groups
        .into_iter()
        .map(|(key, acc)| SummaryRow {
            key,
            count: acc.count,
            amount_sum: acc.amount_sum,
            spend_total: acc.spend_total,
            reload_count: acc.reload_count,
            amount_mean: mean(acc.amount_sum, acc.count),
        })
        .collect::<Vec<_>>();

    debug!(
        groups = rows.len(),
        skipped,
        spec = ?spec.dimensions(),
        "Summary table computed"
    );

    SummaryTable {
        dimensions: spec.dimensions().to_vec(),
        rows,
        skipped,
    }
}

/// The table's rows ranked by `metric` descending, ties broken by
/// ascending group key, truncated to `n`.
pub fn top_n(table: &SummaryTable, metric: Metric, n: usize) -> Vec<SummaryRow> {
    let mut rows = table.rows.clone();
    // Rows arrive key-ascending; the stable sort keeps that as tie-break.
    rows.sort_by(|a, b| metric.value_of(b).cmp(&metric.value_of(a)));
    rows.truncate(n);
    rows
}

/// Frequency of inferred origin → destination sequences, most frequent
/// first, ties in ascending (origin, destination) order.
///
/// Relies on `trip_id` equalling the record's position, which the
/// normalizer guarantees.
pub fn pair_counts(records: &[DerivedRecord]) -> Vec<PairCount> {
    let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();

    for record in records {
        let Some(pair_id) = record.trip_pair else {
            continue;
        };
        let destination = records
            .get(pair_id as usize)
            .and_then(|r| r.record.location.clone());
        let origin = record.record.location.clone();

        if let (Some(origin), Some(destination)) = (origin, destination) {
            *counts.entry((origin, destination)).or_default() += 1;
        }
    }

    let mut pairs: Vec<PairCount> = counts
        .into_iter()
        .map(|((origin, destination), count)| PairCount {
            origin,
            destination,
            count,
        })
        .collect();
    pairs.sort_by(|a, b| b.count.cmp(&a.count));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::types::Dimension;
    use crate::derive::{PairingRules, derive_records};
    use crate::parser::NormalizedRecord;
    use chrono::NaiveDateTime;
    use std::str::FromStr;

    fn fare(trip_id: u64, ts: &str, agency: &str, location: &str, amount: &str) -> NormalizedRecord {
        NormalizedRecord {
            trip_id,
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap(),
            agency: agency.to_string(),
            location: Some(location.to_string()),
            type_label: "Fare Payment".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    fn derived(records: Vec<NormalizedRecord>) -> Vec<DerivedRecord> {
        derive_records(&records, &PairingRules::default())
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_summarize_by_location() {
        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "AgencyA", "StopX", "-3.25"),
            fare(1, "2024-01-01T08:30", "AgencyA", "StopY", "-2.75"),
            fare(2, "2024-01-02T09:00", "AgencyA", "StopX", "-3.25"),
        ]);
        let spec = GroupingSpec::parse("location").unwrap();
        let table = summarize(&records, &spec);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 0);

        let stop_x = &table.rows[0];
        assert_eq!(stop_x.key, vec!["StopX"]);
        assert_eq!(stop_x.count, 2);
        assert_eq!(stop_x.amount_sum, dec("-6.50"));
        assert_eq!(stop_x.spend_total, dec("6.50"));
        assert_eq!(stop_x.amount_mean, dec("-3.25"));

        let stop_y = &table.rows[1];
        assert_eq!(stop_y.key, vec!["StopY"]);
        assert_eq!(stop_y.count, 1);
        assert_eq!(stop_y.amount_sum, dec("-2.75"));
    }

    #[test]
    fn test_summarize_is_deterministic() {
        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "GO Transit", "Union Station", "-5.70"),
            fare(1, "2024-01-01T17:00", "TTC", "St George Station", "-3.30"),
        ]);
        let spec = GroupingSpec::parse("agency,location").unwrap();

        assert_eq!(summarize(&records, &spec), summarize(&records, &spec));
    }

    #[test]
    fn test_one_dimension_sums_are_conserved() {
        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "GO Transit", "Union Station", "-5.70"),
            fare(1, "2024-01-01T17:00", "TTC", "St George Station", "-3.30"),
            fare(2, "2024-01-02T08:00", "GO Transit", "Union Station", "-5.70"),
        ]);
        let total: Decimal = records.iter().map(|r| r.record.amount).sum();

        let table = summarize(&records, &GroupingSpec::parse("agency").unwrap());
        let grouped: Decimal = table.rows.iter().map(|r| r.amount_sum).sum();

        assert_eq!(grouped, total);
    }

    #[test]
    fn test_summarize_skips_records_without_dimension() {
        let mut reload = fare(1, "2024-01-01T12:00", "PRESTO", "unused", "40.00");
        reload.location = None;
        reload.type_label = "Load Amount: Online".to_string();

        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "TTC", "Union Station", "-3.30"),
            reload,
        ]);
        let table = summarize(&records, &GroupingSpec::parse("location").unwrap());

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.skipped, 1);
    }

    #[test]
    fn test_reload_counts() {
        let mut reload = fare(1, "2024-01-01T12:00", "PRESTO", "Union Station", "25.00");
        reload.type_label = "Load Amount".to_string();

        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "TTC", "Union Station", "-3.30"),
            reload,
        ]);
        let table = summarize(&records, &GroupingSpec::parse("location").unwrap());

        let row = &table.rows[0];
        assert_eq!(row.count, 2);
        assert_eq!(row.reload_count, 1);
        assert_eq!(row.spend_total, dec("3.30"));
        assert_eq!(row.amount_sum, dec("21.70"));
    }

    #[test]
    fn test_hour_keys_zero_padded_for_lexicographic_order() {
        let records = derived(vec![
            fare(0, "2024-01-01T09:00", "TTC", "A", "-1.00"),
            fare(1, "2024-01-01T10:00", "TTC", "B", "-1.00"),
        ]);
        let table = summarize(&records, &GroupingSpec::parse("hour_of_day").unwrap());

        let keys: Vec<&str> = table.rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["09", "10"]);
    }

    #[test]
    fn test_top_n_orders_by_metric_then_key() {
        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "TTC", "B Stop", "-2.00"),
            fare(1, "2024-01-02T08:00", "TTC", "A Stop", "-2.00"),
            fare(2, "2024-01-03T08:00", "TTC", "C Stop", "-2.00"),
            fare(3, "2024-01-04T08:00", "TTC", "C Stop", "-2.00"),
        ]);
        let table = summarize(&records, &GroupingSpec::parse("location").unwrap());
        let top = top_n(&table, Metric::Count, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, vec!["C Stop"]);
        // Tie between A Stop and B Stop resolves lexicographically.
        assert_eq!(top[1].key, vec!["A Stop"]);
    }

    #[test]
    fn test_pair_counts() {
        let records = derived(vec![
            fare(0, "2024-01-01T08:00", "GO Transit", "Union Station", "-5.70"),
            fare(1, "2024-01-01T08:45", "GO Transit", "Aldershot GO", "-5.70"),
            fare(2, "2024-01-02T08:00", "GO Transit", "Union Station", "-5.70"),
            fare(3, "2024-01-02T08:45", "GO Transit", "Aldershot GO", "-5.70"),
            fare(4, "2024-01-02T17:00", "GO Transit", "Union Station", "-5.70"),
        ]);
        let pairs = pair_counts(&records);

        assert_eq!(pairs[0].origin, "Union Station");
        assert_eq!(pairs[0].destination, "Aldershot GO");
        assert_eq!(pairs[0].count, 2);
        // The return leg on day two also pairs.
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_summarize_empty_records() {
        let table = summarize(&[], &GroupingSpec::new(vec![Dimension::Agency]).unwrap());
        assert!(table.rows.is_empty());
        assert_eq!(table.skipped, 0);
    }
}
