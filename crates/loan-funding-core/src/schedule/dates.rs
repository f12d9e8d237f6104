//! Calendar-month arithmetic with explicit day-of-month clamping.
//!
//! Due dates advance by whole calendar months; when the anchor day does not
//! exist in the target month (Jan 31 + 1 month), the day clamps to the last
//! valid day (Feb 28/29), never rolling into the following month.

use chrono::{Datelike, NaiveDate};

/// Advance a date by `months` calendar months, clamping the day-of-month.
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid for target month")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_plain_advance_keeps_day() {
        assert_eq!(add_months_clamped(d(2025, 3, 15), 1), d(2025, 4, 15));
        assert_eq!(add_months_clamped(d(2025, 3, 15), 11), d(2026, 2, 15));
    }

    #[test]
    fn test_jan_31_clamps_to_feb_end() {
        assert_eq!(add_months_clamped(d(2025, 1, 31), 1), d(2025, 2, 28));
        assert_eq!(add_months_clamped(d(2024, 1, 31), 1), d(2024, 2, 29));
    }

    #[test]
    fn test_clamp_applies_per_target_month() {
        // Jan 31 + 2 months lands back on a 31-day month.
        assert_eq!(add_months_clamped(d(2025, 1, 31), 2), d(2025, 3, 31));
        assert_eq!(add_months_clamped(d(2025, 1, 31), 3), d(2025, 4, 30));
    }

    #[test]
    fn test_year_rollover() {
        assert_eq!(add_months_clamped(d(2025, 11, 30), 3), d(2026, 2, 28));
        assert_eq!(add_months_clamped(d(2025, 12, 31), 1), d(2026, 1, 31));
    }

    #[test]
    fn test_century_leap_rule() {
        // 2000 was a leap year; 2100 is not.
        assert_eq!(add_months_clamped(d(2000, 1, 31), 1), d(2000, 2, 29));
        assert_eq!(add_months_clamped(d(2100, 1, 31), 1), d(2100, 2, 28));
    }
}
