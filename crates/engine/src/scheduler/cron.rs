//! Simplified six-field cron evaluation.
//!
//! Field order: second minute hour day month day-of-week. Only the handful
//! of patterns flows actually use are evaluated; anything else falls back
//! to "one hour from now". A mis-scheduled flow runs an hour late and
//! recovers; a scheduler that errors out does not, so malformed input is
//! reported on the warning channel instead of failing.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use tracing::warn;

/// Compute the next run after `now` for a cron expression.
///
/// Resolution order:
/// 1. fixed daily time (`minute` and `hour` concrete, `day` wildcard)
/// 2. `*/N` in the minute field -> now + N minutes
/// 3. `*/N` in the hour field -> now + N hours
/// 4. top-of-hour hourly (`0 0 *`) -> next hour boundary
/// 5. anything else -> now + 1 hour
pub fn next_run(expression: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 6 {
        return fallback(expression, "expected 6 fields", now);
    }

    let second = fields[0];
    let minute = fields[1];
    let hour = fields[2];
    let day = fields[3];

    // Fixed daily time, e.g. "0 30 14 * * ?".
    if let (Ok(minute), Ok(hour)) = (minute.parse::<u32>(), hour.parse::<u32>()) {
        if is_wildcard(day) {
            return match daily_at(hour, minute, now) {
                Some(next) => next,
                None => fallback(expression, "hour or minute out of range", now),
            };
        }
    }

    // "*/N" minutes.
    if let Some(n) = step_value(minute) {
        return now + Duration::minutes(n);
    }

    // "*/N" hours.
    if let Some(n) = step_value(hour) {
        return now + Duration::hours(n);
    }

    // Top of every hour: "0 0 * ...".
    if second == "0" && minute == "0" && hour == "*" {
        return next_hour_boundary(now);
    }

    fallback(expression, "unrecognized pattern", now)
}

fn is_wildcard(field: &str) -> bool {
    field == "*" || field == "?"
}

/// Parse a `*/N` field into N, rejecting zero.
fn step_value(field: &str) -> Option<i64> {
    let n = field.strip_prefix("*/")?.parse::<i64>().ok()?;
    (n > 0).then_some(n)
}

fn daily_at(hour: u32, minute: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let candidate = now.date_naive().and_hms_opt(hour, minute, 0)?;
    let candidate = Utc.from_utc_datetime(&candidate);
    if candidate > now {
        Some(candidate)
    } else {
        Some(candidate + Duration::days(1))
    }
}

fn next_hour_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + Duration::hours(1)
}

fn fallback(expression: &str, reason: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    warn!(
        expression = %expression,
        reason = %reason,
        "Unsupported cron expression, scheduling one hour out"
    );
    now + Duration::hours(1)
}
