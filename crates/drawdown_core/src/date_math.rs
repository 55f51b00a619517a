//! Calendar helpers for counting withdrawal periods.
//!
//! Periods are calendar months anchored on the retirement start date. These
//! helpers do direct year/month arithmetic instead of going through jiff's
//! `Span` machinery, which is correct but heavier than needed here.

use jiff::civil::Date;

/// Fast leap year check.
#[inline]
pub fn is_leap_year(year: i16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Days in `month` of `year` without constructing a `Date`.
#[inline]
pub fn days_in_month(year: i16, month: i8) -> i8 {
    const DAYS: [i8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

/// Whole calendar months from `start` to `end`.
///
/// A month only counts once `end` reaches the same day-of-month as `start`
/// (or the last day of a shorter month). Negative when `end < start`.
pub fn months_between(start: Date, end: Date) -> i32 {
    if end < start {
        return -months_between(end, start);
    }

    let mut months = (end.year() as i32 - start.year() as i32) * 12
        + (end.month() as i32 - start.month() as i32);

    let end_is_month_end = end.day() == days_in_month(end.year(), end.month());
    if end.day() < start.day() && !end_is_month_end {
        months -= 1;
    }
    months
}

/// Add `n` calendar months, clamping the day to the target month's length.
pub fn add_months(d: Date, n: i32) -> Date {
    let zero_based = d.year() as i32 * 12 + (d.month() as i32 - 1) + n;
    let year = zero_based.div_euclid(12) as i16;
    let month = (zero_based.rem_euclid(12) + 1) as i8;
    let day = d.day().min(days_in_month(year, month));
    jiff::civil::date(year, month, day)
}
