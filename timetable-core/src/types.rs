use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Teaching day of the weekly grid
///
/// Only the first half of the week is selectable; the second half mirrors it
/// at export time (see [`Day::paired_weekday`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    /// Paired with Thursday
    Monday,
    /// Paired with Friday
    Tuesday,
    /// Paired with Saturday
    Wednesday,
}

impl Day {
    /// All teaching days in grid order
    pub const ALL: [Self; 3] = [Self::Monday, Self::Tuesday, Self::Wednesday];

    /// Full English name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
        }
    }

    /// Calendar weekday of the day itself
    pub const fn weekday(self) -> Weekday {
        match self {
            Self::Monday => Weekday::Mon,
            Self::Tuesday => Weekday::Tue,
            Self::Wednesday => Weekday::Wed,
        }
    }

    /// Day two days later on which the same grid repeats
    pub const fn paired_weekday(self) -> Weekday {
        match self {
            Self::Monday => Weekday::Thu,
            Self::Tuesday => Weekday::Fri,
            Self::Wednesday => Weekday::Sat,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Day {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Self::Monday),
            "tuesday" | "tue" => Ok(Self::Tuesday),
            "wednesday" | "wed" => Ok(Self::Wednesday),
            other => Err(Error::Config(format!(
                "'{other}' is not a teaching day (expected Monday, Tuesday or Wednesday)"
            ))),
        }
    }
}

/// One catalog entry: a course taught in a slot on a day
///
/// Identity is the full triple; two offerings with the same name in
/// different slots are different offerings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offering {
    /// Teaching day
    pub day: Day,
    /// Slot code, e.g. `T3`
    pub slot: String,
    /// Course name as listed in the catalog
    pub name: String,
}

impl Offering {
    /// Offering for a course in a cell
    pub fn new(day: Day, slot: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            day,
            slot: slot.into(),
            name: name.into(),
        }
    }

    /// Whether both offerings occupy the same grid cell
    pub fn same_cell(&self, other: &Self) -> bool {
        self.day == other.day && self.slot == other.slot
    }

    /// Semester half the course runs in
    pub fn duration(&self) -> CourseDuration {
        CourseDuration::from_name(&self.name)
    }
}

impl fmt::Display for Offering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.day, self.slot)
    }
}

/// Which part of the semester a course runs in, read from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseDuration {
    /// Whole semester
    Full,
    /// First half, marked `(H1)`
    H1,
    /// Second half, marked `(H2)`
    H2,
}

impl CourseDuration {
    /// Read the half-semester marker from a course name
    pub fn from_name(name: &str) -> Self {
        if name.contains("(H1)") {
            Self::H1
        } else if name.contains("(H2)") && !name.contains("(H1/H2)") {
            Self::H2
        } else {
            Self::Full
        }
    }

    /// Short badge text, `None` for full-semester courses
    pub const fn badge(self) -> Option<&'static str> {
        match self {
            Self::Full => None,
            Self::H1 => Some("H1"),
            Self::H2 => Some("H2"),
        }
    }
}

/// Grid-driven listing filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMode {
    /// Every slot of a day
    Day(Day),
    /// A slot across all days
    Slot(String),
    /// One grid cell
    Intersection(Day, String),
}

impl FilterMode {
    /// Whether the offering falls inside the filter
    pub fn matches(&self, offering: &Offering) -> bool {
        match self {
            Self::Day(day) => offering.day == *day,
            Self::Slot(slot) => offering.slot == *slot,
            Self::Intersection(day, slot) => offering.day == *day && offering.slot == *slot,
        }
    }

    /// Heading shown above the listing
    pub fn title(&self) -> String {
        match self {
            Self::Day(day) => format!("COURSES ON {day}"),
            Self::Slot(slot) => format!("COURSES IN {slot}"),
            Self::Intersection(day, slot) => format!("{day} - {slot}"),
        }
    }
}

/// Colour theme of the front end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Default theme
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl Theme {
    /// The other theme
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Lowercase name, as persisted
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::Config(format!("unknown theme '{other}'"))),
        }
    }
}

/// Everything that survives between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    /// Selected offerings in selection order
    #[serde(default)]
    pub selected: Vec<Offering>,
    /// Last chosen theme
    #[serde(default)]
    pub theme: Theme,
}

/// Weekly event recurrence (rendered as RRULE/EXDATE)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// Last instant an occurrence may start at (UNTIL)
    pub until: Option<NaiveDateTime>,
    /// Occurrences to skip (EXDATE)
    pub exception_dates: Vec<NaiveDateTime>,
}

/// A calendar event projected from one selected offering
///
/// Times are floating local times; the calendar-level timezone hint decides
/// how clients place them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringEvent {
    /// Course name
    pub summary: String,
    /// Slot code the times come from
    pub slot: String,
    /// Weekday the event is anchored on
    pub weekday: Weekday,
    /// First occurrence start
    pub start: NaiveDateTime,
    /// First occurrence end
    pub end: NaiveDateTime,
    /// Repetition, `None` for a single occurrence
    pub recurrence: Option<RecurrenceRule>,
}

/// Calendar rendering options
#[derive(Debug, Clone)]
pub struct IcsOptions {
    /// Emitted as X-WR-CALNAME
    pub calendar_name: Option<String>,
    /// Emitted as X-WR-TIMEZONE
    pub timezone: Option<String>,
    /// Alarm this many minutes before each class
    pub reminder_minutes: Option<u32>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some(DEFAULT_CALENDAR_NAME.to_string()),
            timezone: None,
            reminder_minutes: None,
        }
    }
}

/// Calendar name when the dataset names none
pub const DEFAULT_CALENDAR_NAME: &str = "IIITH Timetable";

/// A rendered calendar ready to be offered as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarExport {
    /// Suggested file name
    pub file_name: String,
    /// The ICS document
    pub content: String,
    /// Number of VEVENTs in `content`
    pub event_count: usize,
}
