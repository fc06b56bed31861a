//! ISO 8601 durations as reported in `contentDetails.duration`.
//!
//! The Data API encodes video lengths as `PT#H#M#S`, with a `#D` day part for
//! very long streams and `P0D` for live broadcasts. Values are parsed into a
//! [`TimeDelta`] with integer nanosecond precision so sums never drift.
//! Calendar units (years, months) have no fixed length and are rejected.

use chrono::TimeDelta;

use crate::error::{Error, Result};

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i128 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i128 = 7 * NANOS_PER_DAY;

const DATE_UNITS: [(char, i128); 2] = [('W', NANOS_PER_WEEK), ('D', NANOS_PER_DAY)];
const TIME_UNITS: [(char, i128); 3] = [
    ('H', NANOS_PER_HOUR),
    ('M', NANOS_PER_MINUTE),
    ('S', NANOS_PER_SECOND),
];

/// Parses a duration such as `PT2H15M33S`, `P1DT30M`, `PT0.5S` or `P0D`.
pub fn parse_iso8601(text: &str) -> Result<TimeDelta> {
    let invalid = || Error::InvalidDuration(text.to_owned());

    let body = text.trim().strip_prefix('P').ok_or_else(invalid)?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return Err(invalid()),
        Some((date, time)) => (date, time),
        None => (body, ""),
    };
    if date_part.is_empty() && time_part.is_empty() {
        return Err(invalid());
    }

    let date_nanos = sum_components(date_part, &DATE_UNITS).ok_or_else(invalid)?;
    let time_nanos = sum_components(time_part, &TIME_UNITS).ok_or_else(invalid)?;
    let total = date_nanos.checked_add(time_nanos).ok_or_else(invalid)?;

    let seconds = i64::try_from(total / NANOS_PER_SECOND).map_err(|_| invalid())?;
    let nanos = (total % NANOS_PER_SECOND) as u32;
    TimeDelta::new(seconds, nanos).ok_or_else(invalid)
}

/// Sums `<number><unit>` pairs; units must follow the order in `units` and
/// appear at most once. Only seconds may carry a fraction.
fn sum_components(part: &str, units: &[(char, i128)]) -> Option<i128> {
    let mut total: i128 = 0;
    let mut next_unit = 0;
    let mut start = 0;

    for (index, ch) in part.char_indices() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            continue;
        }
        let offset = units[next_unit..].iter().position(|(unit, _)| *unit == ch)?;
        let (unit, nanos_per_unit) = units[next_unit + offset];
        next_unit += offset + 1;

        let amount = amount_nanos(&part[start..index], nanos_per_unit, unit == 'S')?;
        total = total.checked_add(amount)?;
        start = index + ch.len_utf8();
    }

    // trailing number without a unit designator
    if start != part.len() {
        return None;
    }
    Some(total)
}

fn amount_nanos(number: &str, nanos_per_unit: i128, allow_fraction: bool) -> Option<i128> {
    let (whole, fraction) = match number.split_once(['.', ',']) {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut nanos = whole.parse::<i128>().ok()?.checked_mul(nanos_per_unit)?;

    if let Some(fraction) = fraction {
        if !allow_fraction
            || fraction.is_empty()
            || fraction.len() > 9
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let scaled: i128 = format!("{fraction:0<9}").parse().ok()?;
        nanos = nanos.checked_add(scaled)?;
    }
    Some(nanos)
}

/// Renders durations as `H:MM:SS` or `M:SS` for short totals. Sub-second
/// remainders are dropped.
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
