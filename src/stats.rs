use chrono::{NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::derive::DerivedRecord;

/// Session-wide snapshot of the loaded export: the dashboard's headline
/// numbers, computed once per file.
#[derive(Debug, Default, Serialize)]
pub struct UsageStats {
    pub total_records: usize,
    pub fare_count: usize,
    pub reload_count: usize,
    pub unique_stops: usize,
    pub unique_agencies: usize,

    /// Sum of |amount| over spend records (amount < 0).
    pub total_spent: Decimal,
    /// Sum of amount over reload records (amount > 0).
    pub total_reloaded: Decimal,

    pub days_travelled: usize,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,

    /// 0 = Monday .. 6 = Sunday; ties resolve to the earlier day.
    pub busiest_weekday: Option<u8>,
    pub peak_hour: Option<u8>,
    pub inferred_pairs: usize,
}

impl UsageStats {
    pub fn from_records(records: &[DerivedRecord]) -> Self {
        let mut s = UsageStats::default();

        let mut stops = HashSet::new();
        let mut agencies = HashSet::new();
        let mut days = HashSet::new();
        let mut weekday_counts = [0usize; 7];
        let mut hour_counts = [0usize; 24];

        for r in records {
            s.total_records += 1;

            if r.record.amount < Decimal::ZERO {
                s.fare_count += 1;
                s.total_spent += -r.record.amount;
            } else if r.record.amount > Decimal::ZERO {
                s.reload_count += 1;
                s.total_reloaded += r.record.amount;
            }

            if let Some(location) = &r.record.location {
                stops.insert(location.clone());
            }
            agencies.insert(r.record.agency.clone());
            days.insert(r.date);

            weekday_counts[r.day_of_week as usize] += 1;
            hour_counts[r.hour_of_day as usize] += 1;

            if r.trip_pair.is_some() {
                s.inferred_pairs += 1;
            }
        }

        s.unique_stops = stops.len();
        s.unique_agencies = agencies.len();
        s.days_travelled = days.len();
        s.first_seen = records.first().map(|r| r.record.timestamp);
        s.last_seen = records.last().map(|r| r.record.timestamp);
        s.busiest_weekday = argmax(&weekday_counts);
        s.peak_hour = argmax(&hour_counts);

        s
    }

    /// Human-readable name of the busiest weekday, for log output.
    pub fn busiest_weekday_name(&self) -> Option<&'static str> {
        let day = match self.busiest_weekday? {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            _ => Weekday::Sun,
        };
        Some(match day {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        })
    }
}

/// Index of the largest count, or `None` when all counts are zero. Ties
/// resolve to the smallest index.
fn argmax(counts: &[usize]) -> Option<u8> {
    let (idx, &max) = counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
    if max == 0 { None } else { Some(idx as u8) }
}
