use rust_decimal::Decimal;
use std::str::FromStr;

use transit_insights::aggregate::{GroupingSpec, Metric, top_n};
use transit_insights::session::{SessionConfig, SessionContext};

const SAMPLE: &str = "\
Date,Transit Agency,Location,Type,Amount,Balance
01/01/2024 08:00:00 AM,AgencyA,StopX,Fare Payment,-$3.25,$20.00
01/01/2024 08:30:00 AM,AgencyA,StopY,Fare Payment,-$2.75,$17.25
01/02/2024 09:00:00 AM,AgencyA,StopX,Fare Payment,-$3.25,$14.00
";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_full_pipeline_location_summary() {
    let session = SessionContext::load(SAMPLE.as_bytes(), &SessionConfig::default()).unwrap();

    assert_eq!(session.normalized().len(), 3);
    assert_eq!(session.diagnostics().rows_excluded, 0);

    let table = session.summary(&GroupingSpec::parse("location").unwrap());
    assert_eq!(table.rows.len(), 2);

    let stop_x = table.rows.iter().find(|r| r.key == vec!["StopX"]).unwrap();
    assert_eq!(stop_x.count, 2);
    assert_eq!(stop_x.amount_sum, dec("-6.50"));

    let stop_y = table.rows.iter().find(|r| r.key == vec!["StopY"]).unwrap();
    assert_eq!(stop_y.count, 1);
    assert_eq!(stop_y.amount_sum, dec("-2.75"));
}

#[test]
fn test_malformed_row_only_affects_itself() {
    let with_bad_row = format!(
        "{}not-a-date,AgencyA,StopZ,Fare Payment,-$1.00,$13.00\n",
        SAMPLE
    );
    let session =
        SessionContext::load(with_bad_row.as_bytes(), &SessionConfig::default()).unwrap();

    assert_eq!(session.normalized().len(), 3);
    assert_eq!(session.diagnostics().rows_excluded, 1);

    // The surviving records still derive exactly as without the bad row.
    let clean = SessionContext::load(SAMPLE.as_bytes(), &SessionConfig::default()).unwrap();
    for (a, b) in session.derived().iter().zip(clean.derived()) {
        assert_eq!(a.sequence_index, b.sequence_index);
        assert_eq!(a.record.trip_id, b.record.trip_id);
    }
}

#[test]
fn test_headers_only_yields_empty_products() {
    let session = SessionContext::load(
        b"Date,Transit Agency,Location,Type,Amount,Balance\n",
        &SessionConfig::default(),
    )
    .unwrap();

    assert!(session.normalized().is_empty());
    assert!(session.derived().is_empty());
    assert_eq!(session.diagnostics().rows_processed, 0);
    assert_eq!(session.diagnostics().rows_excluded, 0);
    assert!(session.summary(&GroupingSpec::parse("agency").unwrap()).rows.is_empty());
}

#[test]
fn test_amount_conservation_across_one_dimension() {
    let session = SessionContext::load(SAMPLE.as_bytes(), &SessionConfig::default()).unwrap();

    let total: Decimal = session.derived().iter().map(|r| r.record.amount).sum();
    for by in ["agency", "location", "day_of_week", "hour_of_day", "month", "date"] {
        let table = session.summary(&GroupingSpec::parse(by).unwrap());
        let grouped: Decimal = table.rows.iter().map(|r| r.amount_sum).sum();
        assert_eq!(grouped, total, "conservation failed for {by}");
    }
}

#[test]
fn test_top_n_is_idempotent() {
    let session = SessionContext::load(SAMPLE.as_bytes(), &SessionConfig::default()).unwrap();
    let spec = GroupingSpec::parse("location").unwrap();

    let first = top_n(&session.summary(&spec), Metric::SpendTotal, 5);
    let second = top_n(&session.summary(&spec), Metric::SpendTotal, 5);
    assert_eq!(first, second);
    assert_eq!(first[0].key, vec!["StopX"]);
}

#[test]
fn test_sequence_and_pairs_end_to_end() {
    let session = SessionContext::load(SAMPLE.as_bytes(), &SessionConfig::default()).unwrap();
    let derived = session.derived();

    let indices: Vec<u32> = derived.iter().map(|d| d.sequence_index).collect();
    assert_eq!(indices, vec![0, 1, 0]);

    let pairs = session.pairs(10);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].origin, "StopX");
    assert_eq!(pairs[0].destination, "StopY");
    assert_eq!(pairs[0].count, 1);
}
