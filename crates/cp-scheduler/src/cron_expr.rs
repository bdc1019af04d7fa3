use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Standard cron expressions here are five-field (minute hour dom month
/// dow); the `cron` crate expects a leading seconds field, so a fixed `0`
/// is prefixed before parsing.
pub fn parse(expr: &str) -> Result<Schedule, String> {
    let six_field = format!("0 {expr}");
    Schedule::from_str(&six_field).map_err(|e| e.to_string())
}

pub fn next_fire_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// True once `schedule`'s next fire at-or-before `now`, given the last
/// point it was evaluated from. Used by the tick loop to decide whether a
/// job is due this pass.
pub fn is_due(schedule: &Schedule, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match next_fire_after(schedule, since) {
        Some(next) => next <= now,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_five_field_expression() {
        let schedule = parse("0 * * * *").expect("valid expression");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = next_fire_after(&schedule, start).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(parse("not a cron expr").is_err());
    }

    #[test]
    fn due_when_next_fire_has_passed() {
        let schedule = parse("0 * * * *").expect("valid expression");
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap();
        assert!(is_due(&schedule, since, now));
    }

    #[test]
    fn not_due_before_next_fire() {
        let schedule = parse("0 * * * *").expect("valid expression");
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        assert!(!is_due(&schedule, since, now));
    }
}
