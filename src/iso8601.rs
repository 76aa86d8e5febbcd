//! ISO-8601 datetimes and durations on top of `chrono`.
//!
//! Durations are fixed-length: years and months have no fixed length without
//! an anchor date, so a duration that uses them is rejected.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};

/// Parse an ISO-8601 timestamp. Timestamps without an offset are taken as UTC;
/// a bare date means midnight.
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>, String> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc().fixed_offset());
    }
    Err(format!("'{text}' is not an ISO 8601 datetime"))
}

pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

/// Parse an ISO-8601 duration such as `P1D`, `PT1H30M`, `P2W` or `-PT0.5S`.
///
/// The grammar is the `iso8601` crate's, which keeps millisecond precision.
/// A leading sign is accepted on top of it.
pub fn parse_duration(text: &str) -> Result<TimeDelta, String> {
    let original = text;
    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    // The crate accepts a bare `P`; a duration needs at least one amount.
    if !rest.starts_with('P') || !rest.bytes().any(|b| b.is_ascii_digit()) {
        return Err(format!("'{original}' is not an ISO 8601 duration"));
    }

    let (seconds, millis) = match iso8601::duration(rest)
        .map_err(|e| format!("'{original}' is not an ISO 8601 duration: {e}"))?
    {
        iso8601::Duration::Weeks(weeks) => (i64::from(weeks) * 7 * 86_400, 0),
        iso8601::Duration::YMDHMS {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        } => {
            if year != 0 || month != 0 {
                return Err("the ISO 8601 duration provided can not contain years or months".into());
            }
            let seconds = i64::from(day) * 86_400
                + i64::from(hour) * 3_600
                + i64::from(minute) * 60
                + i64::from(second);
            (seconds, i64::from(millisecond))
        }
    };

    let delta = TimeDelta::try_seconds(seconds)
        .and_then(|d| d.checked_add(&TimeDelta::milliseconds(millis)))
        .ok_or_else(|| format!("'{original}' is out of range"))?;
    Ok(if negative { -delta } else { delta })
}

/// Render a duration as `P{d}DT{h}H{m}M{s}S`, dropping zero components.
pub fn format_duration(delta: &TimeDelta) -> String {
    let sign = if *delta < TimeDelta::zero() { "-" } else { "" };
    let abs = delta.abs();
    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = format!("{sign}P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || nanos > 0 || (hours == 0 && minutes == 0) {
            if nanos > 0 {
                let frac = format!("{nanos:09}");
                out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{seconds}S"));
            }
        }
    }
    out
}
