//! Calendar structure generator: root / year / month / date notes.
//!
//! # Responsibility
//! - Find or create the calendar container for a date, level by level.
//! - Self-heal: a container that lost its label is found again by title
//!   prefix under its parent and relabelled.
//!
//! # Invariants
//! - Each lookup chain runs inside the caller's write transaction, so two
//!   callers can never create duplicate containers for the same date.
//! - Labels are the primary key of a container; titles are only a fallback.

pub mod title;
pub mod week;

use crate::attributes::{create_label, get_label_value, get_note_with_label, has_label};
use crate::config::{ConfigError, CoreConfig};
use crate::error::{ErrorKind, RepoError};
use crate::hierarchy::{self, HierarchyError};
use crate::model::{NewNote, Note, ROOT_NOTE_ID};
use crate::repo::{Repository, WriteTx};
use chrono::{Datelike, NaiveDate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use title::{render_title, TitleValues, DEFAULT_DATE_PATTERN, DEFAULT_MONTH_PATTERN};
pub use week::{parse_date_str, start_of_week, WeekStart};

pub const CALENDAR_ROOT_LABEL: &str = "calendarRoot";
pub const YEAR_LABEL: &str = "yearNote";
pub const MONTH_LABEL: &str = "monthNote";
pub const DATE_LABEL: &str = "dateNote";
pub const SORTED_LABEL: &str = "sorted";
pub const MONTH_PATTERN_LABEL: &str = "monthPattern";
pub const DATE_PATTERN_LABEL: &str = "datePattern";
pub const CALENDAR_ROOT_TITLE: &str = "日历";

/// Errors from calendar lookups.
#[derive(Debug)]
pub enum CalendarError {
    Configuration(ConfigError),
    /// Input is not a `YYYY-MM-DD` date (or date-time).
    InvalidDate(String),
    Hierarchy(HierarchyError),
    Repo(RepoError),
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(err) => err.kind(),
            Self::InvalidDate(_) => ErrorKind::Validation,
            Self::Hierarchy(err) => err.kind(),
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "{err}"),
            Self::InvalidDate(value) => write!(f, "invalid date `{value}`, expected YYYY-MM-DD"),
            Self::Hierarchy(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CalendarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::InvalidDate(_) => None,
            Self::Hierarchy(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CalendarError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}

impl From<HierarchyError> for CalendarError {
    fn from(value: HierarchyError) -> Self {
        Self::Hierarchy(value)
    }
}

impl From<RepoError> for CalendarError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// One level of the calendar tree, as resolved for a given date.
struct Container<'a> {
    level: &'static str,
    label: &'static str,
    label_value: String,
    parent_note_id: &'a str,
    title_prefix: String,
    sorted: bool,
}

/// Returns the calendar root, creating it under `root` on first use.
pub fn root_calendar_note(tx: &WriteTx<'_>) -> Result<Note, CalendarError> {
    if let Some(note) = get_note_with_label(tx.conn(), CALENDAR_ROOT_LABEL, None)? {
        return Ok(note);
    }
    let (note, _) =
        hierarchy::create_note(tx, ROOT_NOTE_ID, NewNote::text(CALENDAR_ROOT_TITLE))?;
    create_label(tx, &note.note_id, CALENDAR_ROOT_LABEL, None)?;
    create_label(tx, &note.note_id, SORTED_LABEL, None)?;
    info!(
        "event=calendar_create module=calendar status=ok level=root note_id={}",
        note.note_id
    );
    Ok(note)
}

pub fn year_note(tx: &WriteTx<'_>, date_str: &str) -> Result<Note, CalendarError> {
    let date = parse_date_str(date_str)?;
    year_note_for(tx, date)
}

pub fn month_note(tx: &WriteTx<'_>, date_str: &str) -> Result<Note, CalendarError> {
    let date = parse_date_str(date_str)?;
    month_note_for(tx, date)
}

pub fn date_note(tx: &WriteTx<'_>, date_str: &str) -> Result<Note, CalendarError> {
    let date = parse_date_str(date_str)?;
    date_note_for(tx, date)
}

/// Date note of the first day of the week containing `date_str`.
pub fn week_note(
    tx: &WriteTx<'_>,
    date_str: &str,
    week_start: WeekStart,
) -> Result<Note, CalendarError> {
    let date = parse_date_str(date_str)?;
    date_note_for(tx, start_of_week(date, week_start))
}

fn year_note_for(tx: &WriteTx<'_>, date: NaiveDate) -> Result<Note, CalendarError> {
    let year = format!("{:04}", date.year());
    if let Some(note) = get_note_with_label(tx.conn(), YEAR_LABEL, Some(&year))? {
        return Ok(note);
    }
    let root = root_calendar_note(tx)?;
    let container = Container {
        level: "year",
        label: YEAR_LABEL,
        label_value: year.clone(),
        parent_note_id: &root.note_id,
        title_prefix: year.clone(),
        sorted: true,
    };
    resolve_container(tx, container, || year)
}

fn month_note_for(tx: &WriteTx<'_>, date: NaiveDate) -> Result<Note, CalendarError> {
    let month = date.format("%Y-%m").to_string();
    if let Some(note) = get_note_with_label(tx.conn(), MONTH_LABEL, Some(&month))? {
        return Ok(note);
    }
    let root = root_calendar_note(tx)?;
    let year = year_note_for(tx, date)?;
    let pattern = get_label_value(tx.conn(), &root.note_id, MONTH_PATTERN_LABEL)?;
    let month_number = date.format("%m").to_string();
    let container = Container {
        level: "month",
        label: MONTH_LABEL,
        label_value: month,
        parent_note_id: &year.note_id,
        title_prefix: month_number.clone(),
        sorted: true,
    };
    resolve_container(tx, container, || {
        let values = TitleValues {
            month_number_padded: Some(month_number),
            month: Some(title::MONTH_NAMES[date.month0() as usize].to_string()),
            ..TitleValues::default()
        };
        render_title(
            title::pattern_or_default(pattern.as_deref(), DEFAULT_MONTH_PATTERN),
            &values,
        )
    })
}

fn date_note_for(tx: &WriteTx<'_>, date: NaiveDate) -> Result<Note, CalendarError> {
    let day = date.format("%Y-%m-%d").to_string();
    if let Some(note) = get_note_with_label(tx.conn(), DATE_LABEL, Some(&day))? {
        return Ok(note);
    }
    let root = root_calendar_note(tx)?;
    let month = month_note_for(tx, date)?;
    let pattern = get_label_value(tx.conn(), &root.note_id, DATE_PATTERN_LABEL)?;
    let day_number = date.format("%d").to_string();
    let container = Container {
        level: "date",
        label: DATE_LABEL,
        label_value: day,
        parent_note_id: &month.note_id,
        title_prefix: day_number.clone(),
        sorted: false,
    };
    resolve_container(tx, container, || {
        let weekday = date.weekday().num_days_from_sunday() as usize;
        let values = TitleValues {
            day_in_month_padded: Some(day_number),
            week_day: Some(title::WEEKDAY_NAMES[weekday].to_string()),
            ..TitleValues::default()
        };
        render_title(
            title::pattern_or_default(pattern.as_deref(), DEFAULT_DATE_PATTERN),
            &values,
        )
    })
}

/// Reuses an unlabelled child matching the title prefix, else creates one,
/// then (re)applies the container labels.
fn resolve_container<F>(
    tx: &WriteTx<'_>,
    container: Container<'_>,
    make_title: F,
) -> Result<Note, CalendarError>
where
    F: FnOnce() -> String,
{
    let existing = find_by_title_prefix(tx, container.parent_note_id, &container.title_prefix)?;
    let (note, reused) = match existing {
        Some(note) => (note, true),
        None => {
            let (note, _) = hierarchy::create_note(
                tx,
                container.parent_note_id,
                NewNote::text(make_title()),
            )?;
            (note, false)
        }
    };
    create_label(tx, &note.note_id, container.label, Some(&container.label_value))?;
    if container.sorted && !has_label(tx.conn(), &note.note_id, SORTED_LABEL)? {
        create_label(tx, &note.note_id, SORTED_LABEL, None)?;
    }
    info!(
        "event=calendar_create module=calendar status=ok level={} note_id={} reused={}",
        container.level, note.note_id, reused
    );
    Ok(note)
}

/// First active, unprotected child of `parent_note_id` whose title starts
/// with `prefix`, in branch order.
pub fn find_by_title_prefix(
    tx: &WriteTx<'_>,
    parent_note_id: &str,
    prefix: &str,
) -> Result<Option<Note>, CalendarError> {
    let entries = hierarchy::child_entries(tx.conn(), parent_note_id)?;
    Ok(entries
        .into_iter()
        .map(|(_, note)| note)
        .find(|note| !note.is_protected && note.title.starts_with(prefix)))
}

/// Calendar facade running each lookup chain in one write transaction.
pub struct DateNotes<'r> {
    repo: &'r Repository,
    week_start: WeekStart,
}

impl<'r> DateNotes<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self {
            repo,
            week_start: WeekStart::Monday,
        }
    }

    /// Uses the configured week start. An unknown value is rejected here.
    pub fn from_config(repo: &'r Repository, config: &CoreConfig) -> Result<Self, CalendarError> {
        Ok(Self {
            repo,
            week_start: config.week_start()?,
        })
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn root_calendar_note(&self) -> Result<Note, CalendarError> {
        self.repo.write(root_calendar_note)
    }

    pub fn year_note(&self, date_str: &str) -> Result<Note, CalendarError> {
        self.repo.write(|tx| year_note(tx, date_str))
    }

    pub fn month_note(&self, date_str: &str) -> Result<Note, CalendarError> {
        self.repo.write(|tx| month_note(tx, date_str))
    }

    pub fn date_note(&self, date_str: &str) -> Result<Note, CalendarError> {
        self.repo.write(|tx| date_note(tx, date_str))
    }

    pub fn week_note(&self, date_str: &str) -> Result<Note, CalendarError> {
        let week_start = self.week_start;
        self.repo.write(|tx| week_note(tx, date_str, week_start))
    }

    /// Week note with an explicitly named week start (`monday`/`sunday`).
    pub fn week_note_with(&self, date_str: &str, week_start: &str) -> Result<Note, CalendarError> {
        let week_start = WeekStart::parse(week_start)?;
        self.repo.write(|tx| week_note(tx, date_str, week_start))
    }
}
