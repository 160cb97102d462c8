//! Notify-date arithmetic for recurring anniversaries (birthdays, wishlist dates).
//!
//! The anniversary only contributes its month and day. The next occurrence is
//! taken in `now`'s year, or the following year once it has passed, and the
//! lead time is subtracted with ordinary calendar arithmetic (crossing month
//! and year boundaries, never clamping).
//!
//! Feb 29 anniversaries fall on Mar 1 in non-leap years.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use super::errors::DueDateError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `anniversary` (`YYYY-MM-DD`) and compute when to notify.
///
/// `now` is compared at day granularity: an anniversary on `now` itself has
/// not passed yet.
pub fn calculate_notify_date(
    anniversary: &str,
    lead_days: i64,
    now: NaiveDate,
) -> Result<DateTime<Utc>, DueDateError> {
    let anniversary = NaiveDate::parse_from_str(anniversary.trim(), DATE_FORMAT)
        .map_err(|_| DueDateError::InvalidDate(anniversary.to_string()))?;
    notify_date_for(anniversary, lead_days, now)
}

/// Same as [`calculate_notify_date`] for an already parsed anniversary.
pub fn notify_date_for(
    anniversary: NaiveDate,
    lead_days: i64,
    now: NaiveDate,
) -> Result<DateTime<Utc>, DueDateError> {
    let lead = u64::try_from(lead_days).map_err(|_| DueDateError::InvalidLead(lead_days))?;

    let next = next_occurrence(anniversary, now)?;
    let notify = next
        .checked_sub_days(Days::new(lead))
        .ok_or(DueDateError::OutOfRange)?;

    notify
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or(DueDateError::OutOfRange)
}

/// The anniversary's next occurrence on or after `now`.
pub fn next_occurrence(anniversary: NaiveDate, now: NaiveDate) -> Result<NaiveDate, DueDateError> {
    let this_year = occurrence_in(anniversary, now.year())?;
    if this_year < now {
        occurrence_in(anniversary, now.year() + 1)
    } else {
        Ok(this_year)
    }
}

fn occurrence_in(anniversary: NaiveDate, year: i32) -> Result<NaiveDate, DueDateError> {
    NaiveDate::from_ymd_opt(year, anniversary.month(), anniversary.day())
        // only Feb 29 can be missing from a year
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .ok_or(DueDateError::OutOfRange)
}
