use chrono::{NaiveDate, NaiveDateTime};

use crate::models::CallRecord;

/// Inclusive day-granular range test. `from` is widened to the start of its
/// day and `to` to 23:59:59.999 of its day. An inverted range (`from > to`)
/// is simply never matched; no swap is attempted.
pub fn in_range(timestamp: NaiveDateTime, from: NaiveDate, to: NaiveDate) -> bool {
    let Some(start) = from.and_hms_milli_opt(0, 0, 0, 0) else {
        return false;
    };
    let Some(end) = to.and_hms_milli_opt(23, 59, 59, 999) else {
        return false;
    };
    start <= timestamp && timestamp <= end
}

/// Keep the records whose timestamp falls in the range. Records without a
/// parseable timestamp are dropped, not errored.
pub fn filter_by_date_range(
    records: &[CallRecord],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<CallRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .timestamp
                .map(|ts| in_range(ts, from, to))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn boundaries_are_inclusive() {
        let from = date(2025, 1, 1);
        let to = date(2025, 1, 8);

        let start = from.and_hms_milli_opt(0, 0, 0, 0).unwrap();
        let end = to.and_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert!(in_range(start, from, to));
        assert!(in_range(end, from, to));

        // One millisecond past the closing instant is the next day.
        let past_end = date(2025, 1, 9).and_hms_milli_opt(0, 0, 0, 0).unwrap();
        assert!(!in_range(past_end, from, to));
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let ts = date(2025, 1, 4).and_hms_opt(12, 0, 0).unwrap();
        assert!(!in_range(ts, date(2025, 1, 8), date(2025, 1, 1)));
    }

    #[test]
    fn single_day_range() {
        let from = date(2025, 1, 4);
        let noon = from.and_hms_opt(12, 0, 0).unwrap();
        assert!(in_range(noon, from, from));
    }
}
