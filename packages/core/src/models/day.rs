//! Calendar Days and Clock Abstraction
//!
//! Impulses and focus entries are keyed by calendar day (`YYYY-MM-DD`, no
//! timezone component). The day is taken from the local wall clock, never from
//! a UTC timestamp, so a late-evening impulse lands on the user's "today".
//!
//! # Examples
//!
//! ```rust
//! use nodes_core::models::{DayKey, WeekView};
//!
//! let day: DayKey = "2024-06-05".parse().unwrap();
//! assert_eq!(day.to_string(), "2024-06-05");
//!
//! // Weeks start on Monday
//! let week = WeekView::new(day, day);
//! assert_eq!(week.week_start().to_string(), "2024-06-03");
//! ```

use crate::models::ValidationError;
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Day-granularity key used by impulses and focus entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Calendar day of a local wall-clock timestamp
    pub fn from_local(datetime: &DateTime<Local>) -> Self {
        Self(datetime.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn add_days(&self, days: i64) -> Self {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        // Out-of-range shifts saturate at the calendar bounds
        Self(shifted.unwrap_or(self.0))
    }

    /// Monday of the week containing this day
    pub fn week_start(&self) -> Self {
        let offset = self.0.weekday().num_days_from_monday() as i64;
        self.add_days(-offset)
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DAY_FORMAT)
            .map(Self)
            .map_err(|e| ValidationError::InvalidDate(format!("'{}': {}", s, e)))
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Trait for providing the current day and time
///
/// This abstraction enables:
/// - Deterministic tests around "today" and future-day checks
/// - Running the engine against a fixed day (history view)
pub trait Clock: Send + Sync {
    /// Current UTC timestamp
    fn now(&self) -> DateTime<Utc>;

    /// Today's calendar day from the local wall clock
    fn today(&self) -> DayKey;
}

/// System clock using the machine's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> DayKey {
        DayKey::from_local(&Local::now())
    }
}

/// Clock pinned to a specific day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: DayKey,
}

impl FixedClock {
    pub fn new(today: DayKey) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.today
            .date()
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now)
    }

    fn today(&self) -> DayKey {
        self.today
    }
}

/// Week strip shown above the focus list
///
/// Weeks start on Monday. Future days cannot be selected; selecting a day
/// before today switches the page into history mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekView {
    week_start: DayKey,
    selected: DayKey,
    today: DayKey,
}

impl WeekView {
    pub fn new(selected: DayKey, today: DayKey) -> Self {
        Self {
            week_start: selected.week_start(),
            selected,
            today,
        }
    }

    pub fn week_start(&self) -> DayKey {
        self.week_start
    }

    pub fn selected(&self) -> DayKey {
        self.selected
    }

    pub fn today(&self) -> DayKey {
        self.today
    }

    /// The seven days of the displayed week, Monday first
    pub fn days(&self) -> [DayKey; 7] {
        std::array::from_fn(|i| self.week_start.add_days(i as i64))
    }

    pub fn previous_week(&mut self) {
        self.week_start = self.week_start.add_days(-7);
    }

    pub fn next_week(&mut self) {
        self.week_start = self.week_start.add_days(7);
    }

    pub fn is_future(&self, day: DayKey) -> bool {
        day > self.today
    }

    pub fn is_today(&self, day: DayKey) -> bool {
        day == self.today
    }

    /// Select a day; returns `false` (and keeps the selection) for future days
    pub fn select(&mut self, day: DayKey) -> bool {
        if self.is_future(day) {
            return false;
        }
        self.selected = day;
        true
    }

    /// Select today and scroll the strip back to the current week
    pub fn jump_to_today(&mut self) {
        self.selected = self.today;
        self.week_start = self.today.week_start();
    }

    /// Viewing a past day
    pub fn is_history(&self) -> bool {
        self.selected < self.today
    }
}
