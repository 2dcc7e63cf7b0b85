// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure next-run calculator for recurrence patterns.
//!
//! `next_run` is deterministic given `(pattern, now)` and performs no I/O,
//! which is what keeps the rest of the engine testable in isolation. Every
//! call site that needs a "next run" goes through this crate; recurrence
//! math is never re-derived ad hoc.
//!
//! The returned timestamp is always strictly greater than `now`, so a
//! freshly scheduled occurrence can never be due in the same processor
//! cycle that created it.

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use chaser_core::types::{RecurrencePattern, RecurrenceType};
use chaser_core::ChaserError;

/// Compute the next run time for `pattern` relative to `now`.
///
/// Builds a candidate today at `time_of_day` (UTC). If the candidate is in
/// the past (or exactly `now`), it advances by one period:
///
/// - `once`: a one-minute offset, so immediate schedules still flow through
///   the queue instead of being sent inline
/// - `daily`: `interval` days
/// - `weekly`: a bounded day-by-day scan for the next weekday in
///   `days_of_week` (0 = Sunday); whole weeks when the set is empty
/// - `monthly` / `yearly`: calendar months
pub fn next_run(
    pattern: &RecurrencePattern,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ChaserError> {
    if pattern.interval == 0 {
        return Err(ChaserError::Schedule("interval must be at least 1".into()));
    }
    let (hour, minute) = parse_time_of_day(&pattern.time_of_day)?;

    let candidate = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| {
            ChaserError::Schedule(format!("invalid time of day `{}`", pattern.time_of_day))
        })?
        .and_utc();

    match pattern.recurrence_type {
        RecurrenceType::Once => {
            if candidate <= now {
                Ok(now + Duration::minutes(1))
            } else {
                Ok(candidate)
            }
        }
        RecurrenceType::Daily => {
            if candidate <= now {
                Ok(candidate + Duration::days(i64::from(pattern.interval)))
            } else {
                Ok(candidate)
            }
        }
        RecurrenceType::Weekly => next_weekly(pattern, now, candidate),
        RecurrenceType::Monthly => advance_months(now, candidate, pattern.interval),
        RecurrenceType::Yearly => advance_months(now, candidate, pattern.interval * 12),
    }
}

/// Whether the series has no further occurrence after this one.
///
/// `next_occurrence` is the 1-based position the new item would take and
/// `next_at` its computed run time. The calculator does not track send
/// counts itself; the queue processor passes them in.
pub fn series_exhausted(
    pattern: &RecurrencePattern,
    next_occurrence: u32,
    next_at: DateTime<Utc>,
) -> bool {
    if pattern.recurrence_type == RecurrenceType::Once {
        return true;
    }
    if let Some(count) = pattern.end_after_count
        && next_occurrence > count
    {
        return true;
    }
    if let Some(end) = pattern.end_date
        && next_at > end
    {
        return true;
    }
    false
}

fn next_weekly(
    pattern: &RecurrencePattern,
    now: DateTime<Utc>,
    candidate: DateTime<Utc>,
) -> Result<DateTime<Utc>, ChaserError> {
    let days = pattern.days_of_week.as_ref().filter(|d| !d.is_empty());

    let Some(days) = days else {
        // Empty set defaults to the current weekday: advance whole weeks.
        if candidate <= now {
            return Ok(candidate + Duration::days(7 * i64::from(pattern.interval)));
        }
        return Ok(candidate);
    };

    if let Some(day) = days.iter().find(|d| **d > 6) {
        return Err(ChaserError::Schedule(format!(
            "days_of_week entry {day} out of range 0-6"
        )));
    }

    if candidate > now && days.contains(&weekday_index(candidate)) {
        return Ok(candidate);
    }

    // Scan forward one day at a time; any non-empty weekday set matches
    // within 7 days.
    let mut next = candidate;
    for _ in 0..7 {
        next += Duration::days(1);
        if next > now && days.contains(&weekday_index(next)) {
            return Ok(next);
        }
    }
    Err(ChaserError::Schedule(
        "no matching weekday found within 7 days".into(),
    ))
}

fn advance_months(
    now: DateTime<Utc>,
    candidate: DateTime<Utc>,
    months: u32,
) -> Result<DateTime<Utc>, ChaserError> {
    if candidate > now {
        return Ok(candidate);
    }
    candidate
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            ChaserError::Schedule(format!(
                "cannot advance {months} month(s) from {candidate}"
            ))
        })
}

/// Weekday as 0 = Sunday through 6 = Saturday.
fn weekday_index(at: DateTime<Utc>) -> u8 {
    at.weekday().num_days_from_sunday() as u8
}

fn parse_time_of_day(time_of_day: &str) -> Result<(u32, u32), ChaserError> {
    let invalid =
        || ChaserError::Schedule(format!("time_of_day `{time_of_day}` is not HH:MM"));
    let (hour, minute) = time_of_day.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}
