//! Calendar-period helpers shared by the resolver and the aggregators.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};

/// One calendar month for one resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Period { year, month }
    }

    /// Month key as stored in rollup document ids: `YYYY-MM`.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Whether this period is the current calendar month relative to `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.year == today.year() && self.month == today.month()
    }

    /// Epoch-millisecond bounds `[start, end)` of the month, UTC.
    ///
    /// `None` when the year/month pair does not name a real month.
    pub fn bounds_ms(&self) -> Option<(i64, i64)> {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let end = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)?
        };
        Some((start_of_day_ms(start), start_of_day_ms(end)))
    }
}

/// Epoch-millisecond bounds `[start, end)` of one calendar day, UTC.
pub fn day_bounds_ms(day: NaiveDate) -> (i64, i64) {
    (start_of_day_ms(day), start_of_day_ms(day + chrono::Days::new(1)))
}

/// Day key (`YYYY-MM-DD`) of an epoch-millisecond timestamp, UTC.
pub fn day_key_of_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(ts) => ts.date_naive().format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

fn start_of_day_ms(day: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
        .timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_is_zero_padded() {
        assert_eq!(Period::new(2025, 3).month_key(), "2025-03");
    }

    #[test]
    fn bounds_cover_exactly_one_month() {
        let (start, end) = Period::new(2025, 1).bounds_ms().unwrap();
        let (next_start, _) = Period::new(2025, 2).bounds_ms().unwrap();
        assert_eq!(end, next_start);
        assert_eq!(day_key_of_ms(start), "2025-01-01");
        assert_eq!(day_key_of_ms(end - 1), "2025-01-31");
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (_, end) = Period::new(2024, 12).bounds_ms().unwrap();
        assert_eq!(day_key_of_ms(end), "2025-01-01");
    }

    #[test]
    fn invalid_month_has_no_bounds() {
        assert!(Period::new(2025, 13).bounds_ms().is_none());
    }

    #[test]
    fn current_month_detection() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(Period::new(2025, 6).is_current(today));
        assert!(!Period::new(2025, 5).is_current(today));
        assert!(!Period::new(2024, 6).is_current(today));
    }
}
