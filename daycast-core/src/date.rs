//! Calendar date resolution for "today / +1 / +2" in a named timezone.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::WeatherError;

/// Zone-local calendar date `offset_days` after `now`.
///
/// The offset is applied to the local calendar date, never to a UTC instant,
/// so a DST transition inside the window cannot push the result onto the
/// wrong day.
pub fn resolve(offset_days: i64, tz: &str, now: DateTime<Utc>) -> Result<NaiveDate, WeatherError> {
    let zone: Tz = tz
        .parse()
        .map_err(|e| WeatherError::Date(format!("unknown timezone '{tz}': {e}")))?;

    let today = now.with_timezone(&zone).date_naive();
    let days = Days::new(offset_days.unsigned_abs());

    let date = if offset_days >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    };

    date.ok_or_else(|| {
        WeatherError::Date(format!("{today} offset by {offset_days} days is out of range"))
    })
}

/// Same as [`resolve`], formatted as `YYYY-MM-DD`.
pub fn resolve_string(offset_days: i64, tz: &str, now: DateTime<Utc>) -> Result<String, WeatherError> {
    resolve(offset_days, tz, now).map(|d| d.format("%Y-%m-%d").to_string())
}
