//! Cron-expression helpers around the external `cron` crate.
//!
//! The scheduler treats cron parsing as a black box that yields "next fire
//! time"; these helpers only adapt field counts and map errors.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::JobError;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for
/// seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month
/// day-of-week`. Operators write standard 5-field cron.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a 5- or 6-field cron expression.
pub fn parse_schedule(expr: &str) -> Result<Schedule, JobError> {
    Schedule::from_str(&normalize_cron(expr)).map_err(|e| JobError::InvalidCron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// First scheduled time strictly after `after`.
pub fn next_fire_time(expr: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, JobError> {
    let schedule = parse_schedule(expr)?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| JobError::InvalidCron {
            expr: expr.to_string(),
            reason: "no upcoming fire time".to_string(),
        })
}
