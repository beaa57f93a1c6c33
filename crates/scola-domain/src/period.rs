//! Reporting periods used by every aggregation.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Inclusive reporting window `[start, end]` in local server time.
pub struct ReportingPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportingPeriod {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ReportingPeriodError> {
        if end < start {
            return Err(ReportingPeriodError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// Calendar month containing `reference`, ending at `23:59:59.999` on its last day.
    pub fn month_containing(reference: NaiveDateTime) -> Self {
        let first = first_of_month(reference.date());
        let next = next_month(first);
        let start = first.and_time(NaiveTime::MIN);
        let end = start + (next - first) - Duration::milliseconds(1);
        Self { start, end }
    }

    /// Whole-day window covering `from` through `to`, both inclusive.
    pub fn for_dates(from: NaiveDate, to: NaiveDate) -> Result<Self, ReportingPeriodError> {
        let start = from.and_time(NaiveTime::MIN);
        let day_after = to
            .checked_add_signed(Duration::days(1))
            .ok_or(ReportingPeriodError::OutOfRange)?;
        let end = day_after.and_time(NaiveTime::MIN) - Duration::milliseconds(1);
        Self::new(start, end)
    }

    pub fn contains(&self, moment: NaiveDateTime) -> bool {
        moment >= self.start && moment <= self.end
    }

    pub fn label(&self) -> String {
        format!(
            "{} .. {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first + Duration::days(31))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when constructing [`ReportingPeriod`] values.
pub enum ReportingPeriodError {
    InvalidRange,
    /// The window would end past the last representable date.
    OutOfRange,
}

impl fmt::Display for ReportingPeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingPeriodError::InvalidRange => {
                f.write_str("reporting period end must not precede start")
            }
            ReportingPeriodError::OutOfRange => {
                f.write_str("reporting period end is beyond the supported calendar")
            }
        }
    }
}

impl std::error::Error for ReportingPeriodError {}
