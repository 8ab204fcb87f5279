//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds)
//! Minute/hour fields: *, */N, N, a,b,c
//! Day/month/weekday fields: only *
//! Example: "0 8 * * *" = every day at 8:00 in the scheduler's timezone

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Parsed minute/hour sets of a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl CronSpec {
    /// Parse a 5-field expression. Returns `None` for anything unsupported.
    pub fn parse(expression: &str) -> Option<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            tracing::warn!(
                "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
                expression
            );
            return None;
        }
        if parts[2..].iter().any(|f| *f != "*") {
            tracing::warn!(
                "Unsupported cron expression: '{}' (day/month/weekday must be *)",
                expression
            );
            return None;
        }

        let minutes = parse_field(parts[0], 0, 59)?;
        let hours = parse_field(parts[1], 0, 23)?;
        if minutes.is_empty() || hours.is_empty() {
            return None;
        }
        Some(Self { minutes, hours })
    }

    /// Daily at a fixed local time.
    pub fn daily(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self {
            minutes: vec![minute],
            hours: vec![hour],
        })
    }

    fn matches<T: Timelike>(&self, t: &T) -> bool {
        self.minutes.contains(&t.minute()) && self.hours.contains(&t.hour())
    }

    /// First matching minute strictly after `after`, evaluated in `tz`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local = tz.from_utc_datetime(&after.naive_utc());
        let mut candidate = local + Duration::minutes(1);
        candidate = candidate
            .with_second(0)
            .and_then(|c| c.with_nanosecond(0))
            .unwrap_or(candidate);

        // Try up to 48 hours ahead
        for _ in 0..(48 * 60) {
            if self.matches(&candidate) {
                return Some(candidate.with_timezone(&Utc));
            }
            candidate += Duration::minutes(1);
        }

        None
    }
}

/// Parse a simple cron expression and compute the next run time in `tz`.
pub fn next_run_from_cron(expression: &str, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    CronSpec::parse(expression)?.next_after(after, tz)
}

/// Parse a cron field into a list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    // */N — every N
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    // Comma-separated: "0,15,30,45"
    if field.contains(',') {
        let vals: Result<Vec<u32>, _> = field.split(',').map(|s| s.trim().parse()).collect();
        return vals
            .ok()
            .map(|v| v.into_iter().filter(|x| *x >= min && *x <= max).collect());
    }

    // Single number
    let n: u32 = field.parse().ok()?;
    if n >= min && n <= max {
        Some(vec![n])
    } else {
        None
    }
}
