use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Day;

/// Identifies a (year, week) bucket. Weeks follow ISO-8601, so `year` is the
/// ISO week-based year, which differs from the calendar year around New Year.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Self {
        WeekKey { year, week }
    }

    /// The week containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        WeekKey::new(iso.year(), iso.week())
    }

    /// The week containing today's local date.
    pub fn current() -> Self {
        WeekKey::of(Local::now().date_naive())
    }

    /// Monday of this week, or `None` for a week number the year does not have.
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    pub fn previous(&self) -> Option<Self> {
        self.monday()
            .and_then(|m| m.checked_sub_signed(chrono::Duration::weeks(1)))
            .map(WeekKey::of)
    }

    pub fn next(&self) -> Option<Self> {
        self.monday()
            .and_then(|m| m.checked_add_signed(chrono::Duration::weeks(1)))
            .map(WeekKey::of)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = Error;

    /// Accepts `2025-W10`, `2025-w10` and `2025-10`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument(format!("invalid week '{}', use YYYY-Www", s));
        let (year, week) = s.trim().split_once('-').ok_or_else(invalid)?;
        let week = week.trim_start_matches(['W', 'w']);
        let key = WeekKey::new(
            year.parse().map_err(|_| invalid())?,
            week.parse().map_err(|_| invalid())?,
        );
        if key.monday().is_none() {
            return Err(invalid());
        }
        Ok(key)
    }
}

/// The day label for today's local date.
pub fn today() -> Day {
    Day::from_weekday(Local::now().weekday())
}
