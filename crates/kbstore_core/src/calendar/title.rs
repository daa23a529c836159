//! Title templates for calendar container notes.
//!
//! Patterns are plain text with `{token}` placeholders. Known tokens are
//! substituted; anything else (unknown tokens, stray braces) passes through.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9]+)\}").expect("valid title token regex"));

pub const DEFAULT_MONTH_PATTERN: &str = "{monthNumberPadded} - {month}";
pub const DEFAULT_DATE_PATTERN: &str = "{dayInMonthPadded} - {weekDay}";

pub const MONTH_NAMES: [&str; 12] = [
    "一月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月", "十月", "十一月",
    "十二月",
];
/// Indexed by days from Sunday.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "星期日", "星期一", "星期二", "星期三", "星期四", "星期五", "星期六",
];

/// Placeholders understood by the title templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleToken {
    MonthNumberPadded,
    Month,
    DayInMonthPadded,
    WeekDay,
    WeekDay3,
    WeekDay2,
}

impl TitleToken {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "monthNumberPadded" => Some(Self::MonthNumberPadded),
            "month" => Some(Self::Month),
            "dayInMonthPadded" => Some(Self::DayInMonthPadded),
            "weekDay" => Some(Self::WeekDay),
            "weekDay3" => Some(Self::WeekDay3),
            "weekDay2" => Some(Self::WeekDay2),
            _ => None,
        }
    }
}

/// Values available to one template rendering. `None` leaves the token as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleValues {
    pub month_number_padded: Option<String>,
    pub month: Option<String>,
    pub day_in_month_padded: Option<String>,
    pub week_day: Option<String>,
}

impl TitleValues {
    fn lookup(&self, token: TitleToken) -> Option<String> {
        match token {
            TitleToken::MonthNumberPadded => self.month_number_padded.clone(),
            TitleToken::Month => self.month.clone(),
            TitleToken::DayInMonthPadded => self.day_in_month_padded.clone(),
            TitleToken::WeekDay => self.week_day.clone(),
            TitleToken::WeekDay3 => self.week_day.as_deref().map(|day| take_chars(day, 3)),
            TitleToken::WeekDay2 => self.week_day.as_deref().map(|day| take_chars(day, 2)),
        }
    }
}

/// Picks the configured pattern, or `default` when none/blank.
pub fn pattern_or_default<'a>(configured: Option<&'a str>, default: &'a str) -> &'a str {
    match configured {
        Some(pattern) if !pattern.trim().is_empty() => pattern,
        _ => default,
    }
}

/// Substitutes every known token in `pattern`.
pub fn render_title(pattern: &str, values: &TitleValues) -> String {
    TOKEN_RE
        .replace_all(pattern, |caps: &Captures<'_>| {
            TitleToken::parse(&caps[1])
                .and_then(|token| values.lookup(token))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn take_chars(value: &str, count: usize) -> String {
    value.chars().take(count).collect()
}
