//! Week-start conventions and date helpers.

use super::CalendarError;
use crate::config::ConfigError;
use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    /// Parses `monday` / `sunday`. Anything else is a configuration error.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "monday" => Ok(Self::Monday),
            "sunday" => Ok(Self::Sunday),
            other => Err(ConfigError::UnknownWeekStart(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Sunday => "sunday",
        }
    }
}

/// First day of the week containing `date`.
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let days_back = match week_start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date - Duration::days(i64::from(days_back))
}

/// Parses the leading `YYYY-MM-DD` of a date or date-time string.
pub fn parse_date_str(date_str: &str) -> Result<NaiveDate, CalendarError> {
    let head = date_str
        .get(0..10)
        .ok_or_else(|| CalendarError::InvalidDate(date_str.to_string()))?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(date_str.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_date_str, start_of_week, WeekStart};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monday_week_rolls_sunday_back_six_days() {
        // 2024-03-17 is a Sunday.
        assert_eq!(start_of_week(date(2024, 3, 17), WeekStart::Monday), date(2024, 3, 11));
        assert_eq!(start_of_week(date(2024, 3, 13), WeekStart::Monday), date(2024, 3, 11));
        assert_eq!(start_of_week(date(2024, 3, 11), WeekStart::Monday), date(2024, 3, 11));
    }

    #[test]
    fn sunday_week_starts_on_sunday() {
        assert_eq!(start_of_week(date(2024, 3, 17), WeekStart::Sunday), date(2024, 3, 17));
        assert_eq!(start_of_week(date(2024, 3, 16), WeekStart::Sunday), date(2024, 3, 10));
    }

    #[test]
    fn week_may_cross_month_and_year() {
        assert_eq!(start_of_week(date(2025, 1, 1), WeekStart::Monday), date(2024, 12, 30));
    }

    #[test]
    fn parse_accepts_datetime_prefix_and_rejects_garbage() {
        assert_eq!(parse_date_str("2024-03-15 10:22:00.000Z").unwrap(), date(2024, 3, 15));
        assert!(parse_date_str("2024-13-01").is_err());
        assert!(parse_date_str("2024").is_err());
    }

    #[test]
    fn unknown_week_start_is_rejected() {
        assert!(WeekStart::parse("Monday").is_err());
        assert_eq!(WeekStart::parse("sunday").unwrap().as_str(), "sunday");
    }
}
