//! Calendar helpers for monthly forecast periods.

use chrono::{Datelike, Months, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Number of days in `[from, to]`, counting both ends.
pub fn inclusive_span_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

/// Every first-of-month date falling inside `[from, to]`, in order.
///
/// Returns an empty vector when the range contains no month start
/// (e.g. the 5th to the 20th of the same month).
pub fn month_starts(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut periods = Vec::new();
    if to < from {
        return periods;
    }

    let first = if from.day() == 1 {
        Some(from)
    } else {
        from.with_day(1)
            .and_then(|d| d.checked_add_months(Months::new(1)))
    };

    let mut current = first;
    while let Some(date) = current
        && date <= to
    {
        periods.push(date);
        current = date.checked_add_months(Months::new(1));
    }
    periods
}
