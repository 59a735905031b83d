//! Calendar periods used as rollup keys and the gates/windows derived from them

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

/// ISO-8601 week: week-numbering year plus week number (1..=53).
///
/// Format: `2025-W06`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearWeek {
    pub year: i32,
    pub week: u32,
}

impl YearWeek {
    /// Week containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday that starts this week
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

impl fmt::Display for YearWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for YearWeek {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RankingError::InvalidArgument(format!("invalid year-week '{}'", s));

        let (year, week) = s.split_once("-W").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;

        // Rejects week 53 in years that only have 52
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?;

        Ok(Self { year, week })
    }
}

/// Calendar month. Format: `2025-02`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RankingError::InvalidArgument(format!("invalid year-month '{}'", s));

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self { year, month })
    }
}

/// Closed date range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ============================================
// Gates
// ============================================

/// Weekly rollups run on Mondays
pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Monthly rollups run on the 1st
pub fn is_month_start(date: NaiveDate) -> bool {
    date.day() == 1
}

// ============================================
// Windows
// ============================================

/// `[Monday of (date - 7 days), date - 1 day]`.
///
/// On a Monday this is exactly the previous Monday..Sunday.
pub fn weekly_window(date: NaiveDate) -> DateWindow {
    let week_ago = date - Days::new(7);
    let offset = u64::from(week_ago.weekday().num_days_from_monday());

    DateWindow {
        start: week_ago - Days::new(offset),
        end: date - Days::new(1),
    }
}

/// First through last day of the month before `date`
pub fn monthly_window(date: NaiveDate) -> DateWindow {
    let first_of_month = date.with_day(1).unwrap_or(date);

    DateWindow {
        start: first_of_month - Months::new(1),
        end: first_of_month - Days::new(1),
    }
}
