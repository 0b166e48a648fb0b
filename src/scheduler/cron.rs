//! Five-field cron expressions
//!
//! `minute hour day month weekday`, supporting `*`, `*/n`, values, ranges,
//! and comma lists. The three monitoring schedules are plain `*/n` minute
//! patterns, but full field parsing keeps operator-supplied schedules
//! unsurprising.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::{Error, Result};

/// One parsed cron field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    /// `*` matches anything; the day/weekday OR rule needs to know
    wildcard: bool,
    values: BTreeSet<u32>,
}

impl Field {
    fn contains(&self, value: u32) -> bool {
        self.wildcard || self.values.contains(&value)
    }
}

fn parse_field(spec: &str, min: u32, max: u32) -> Result<Field> {
    let invalid = || Error::InvalidArgument(format!("invalid cron field '{}'", spec));

    if spec == "*" {
        return Ok(Field {
            wildcard: true,
            values: BTreeSet::new(),
        });
    }

    if let Some(step) = spec.strip_prefix("*/") {
        let step: u32 = step.parse().map_err(|_| invalid())?;
        if step == 0 || step > max {
            return Err(invalid());
        }
        let values = (min..=max).filter(|v| (v - min) % step == 0).collect();
        return Ok(Field {
            wildcard: false,
            values,
        });
    }

    let mut values = BTreeSet::new();
    for part in spec.split(',') {
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.parse().map_err(|_| invalid())?;
            let end: u32 = end.parse().map_err(|_| invalid())?;
            if start < min || end > max || start > end {
                return Err(invalid());
            }
            values.extend(start..=end);
        } else {
            let value: u32 = part.parse().map_err(|_| invalid())?;
            if value < min || value > max {
                return Err(invalid());
            }
            values.insert(value);
        }
    }
    if values.is_empty() {
        return Err(invalid());
    }
    Ok(Field {
        wildcard: false,
        values,
    })
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day: Field,
    month: Field,
    weekday: Field,
    source: String,
}

impl CronExpr {
    /// Parse `minute hour day month weekday`.
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::InvalidArgument(format!(
                "cron expression '{}' must have 5 fields, got {}",
                expr,
                fields.len()
            )));
        }
        Ok(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            weekday: parse_field(fields[4], 0, 6)?,
            source: expr.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the expression matches a given instant (minute precision).
    pub fn matches(&self, t: DateTime<Utc>) -> bool {
        if !self.minute.contains(t.minute())
            || !self.hour.contains(t.hour())
            || !self.month.contains(t.month())
        {
            return false;
        }

        let day_ok = self.day.contains(t.day());
        // cron numbers Sunday as 0
        let weekday_ok = self.weekday.contains(t.weekday().num_days_from_sunday());

        // Standard cron rule: when both day-of-month and weekday are
        // restricted, either one matching fires the job.
        match (self.day.wildcard, self.weekday.wildcard) {
            (true, true) => true,
            (false, true) => day_ok,
            (true, false) => weekday_ok,
            (false, false) => day_ok || weekday_ok,
        }
    }

    /// The next firing instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        // Truncate to the minute, then scan forward. A year of minutes
        // bounds the scan for any satisfiable five-field expression.
        let mut t = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after)
            + Duration::minutes(1);
        for _ in 0..(366 * 24 * 60) {
            if self.matches(t) {
                return t;
            }
            t += Duration::minutes(1);
        }
        // Unsatisfiable expressions are rejected at parse time; treat an
        // exhausted scan as "fire far in the future".
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_every_15_minutes() {
        let cron = CronExpr::parse("*/15 * * * *").unwrap();
        assert!(cron.matches(at(10, 0)));
        assert!(cron.matches(at(10, 15)));
        assert!(cron.matches(at(10, 30)));
        assert!(cron.matches(at(10, 45)));
        assert!(!cron.matches(at(10, 5)));
        assert!(!cron.matches(at(10, 59)));
    }

    #[test]
    fn test_monitoring_schedules_parse() {
        for expr in ["*/15 * * * *", "*/5 * * * *", "*/1 * * * *"] {
            assert!(CronExpr::parse(expr).is_ok(), "failed to parse {}", expr);
        }
    }

    #[test]
    fn test_every_minute_matches_everything() {
        let cron = CronExpr::parse("*/1 * * * *").unwrap();
        for m in 0..60 {
            assert!(cron.matches(at(7, m)));
        }
    }

    #[test]
    fn test_fixed_time() {
        let cron = CronExpr::parse("30 9 * * *").unwrap();
        assert!(cron.matches(at(9, 30)));
        assert!(!cron.matches(at(9, 31)));
        assert!(!cron.matches(at(10, 30)));
    }

    #[test]
    fn test_ranges_and_lists() {
        let cron = CronExpr::parse("0,30 9-17 * * 1-5").unwrap();
        // 2024-03-15 is a Friday
        assert!(cron.matches(at(9, 0)));
        assert!(cron.matches(at(17, 30)));
        assert!(!cron.matches(at(8, 0)));
        assert!(!cron.matches(at(9, 15)));
    }

    #[test]
    fn test_weekday_restriction() {
        let cron = CronExpr::parse("0 12 * * 0").unwrap(); // Sundays
        let sunday = Utc.with_ymd_and_hms(2024, 3, 17, 12, 0, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert!(cron.matches(sunday));
        assert!(!cron.matches(friday));
    }

    #[test]
    fn test_malformed_expressions_rejected() {
        assert!(CronExpr::parse("").is_err());
        assert!(CronExpr::parse("* * * *").is_err());
        assert!(CronExpr::parse("61 * * * *").is_err());
        assert!(CronExpr::parse("*/0 * * * *").is_err());
        assert!(CronExpr::parse("a * * * *").is_err());
        assert!(CronExpr::parse("5-1 * * * *").is_err());
    }

    #[test]
    fn test_next_after() {
        let cron = CronExpr::parse("*/15 * * * *").unwrap();
        let next = cron.next_after(at(10, 0));
        assert_eq!(next, at(10, 15));

        let next = cron.next_after(at(10, 7));
        assert_eq!(next, at(10, 15));

        // strictly after: an exact match still advances
        let next = cron.next_after(at(10, 45));
        assert_eq!(next, at(11, 0));
    }
}
