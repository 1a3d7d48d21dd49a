//! Named and custom date windows.
//!
//! Every window is half-open, `[start, end)`, with both boundaries on local
//! midnight. Weeks start on Monday.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ForecastError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedRange {
    Today,
    Yesterday,
    Tomorrow,
    ThisWeek,
    LastWeek,
    NextWeek,
    ThisMonth,
    LastMonth,
    NextMonth,
}

impl NamedRange {
    pub fn label(&self) -> &'static str {
        match self {
            NamedRange::Today => "Today",
            NamedRange::Yesterday => "Yesterday",
            NamedRange::Tomorrow => "Tomorrow",
            NamedRange::ThisWeek => "This Week",
            NamedRange::LastWeek => "Last Week",
            NamedRange::NextWeek => "Next Week",
            NamedRange::ThisMonth => "This Month",
            NamedRange::LastMonth => "Last Month",
            NamedRange::NextMonth => "Next Month",
        }
    }

    pub const fn all() -> &'static [NamedRange] {
        &[
            NamedRange::Today,
            NamedRange::Yesterday,
            NamedRange::Tomorrow,
            NamedRange::ThisWeek,
            NamedRange::LastWeek,
            NamedRange::NextWeek,
            NamedRange::ThisMonth,
            NamedRange::LastMonth,
            NamedRange::NextMonth,
        ]
    }
}

impl fmt::Display for NamedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NamedRange {
    type Err = ForecastError;

    /// Accepts labels in any case, with spaces, dashes or underscores
    /// ("This Week", "this-week", "this_week").
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted: String = value
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        NamedRange::all()
            .iter()
            .copied()
            .find(|range| range.label().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| ForecastError::UnknownRange(value.to_string()))
    }
}

/// A labelled half-open time window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Whole days covered. Rounded to the nearest day so a 23 or 25 hour DST
    /// day still counts as one; a non-empty window is at least one day.
    pub fn days_spanned(&self) -> i64 {
        let ms = (self.end - self.start).num_milliseconds();
        if ms <= 0 {
            return 0;
        }
        ((ms + DAY_MS / 2) / DAY_MS).max(1)
    }

    /// "Label (Mar 1, 2024 - Mar 10, 2024)" with the last included day shown.
    pub fn describe<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let last = (self.end - Duration::milliseconds(1)).max(self.start);
        format!(
            "{} ({} - {})",
            self.label,
            self.start.with_timezone(tz).format("%b %-d, %Y"),
            last.with_timezone(tz).format("%b %-d, %Y"),
        )
    }
}

/// Resolves a named range relative to `now`, in `now`'s time zone.
pub fn resolve_predefined<Tz: TimeZone>(range: NamedRange, now: &DateTime<Tz>) -> DateWindow {
    let tz = now.timezone();
    let today = now.date_naive();
    let week = start_of_week(today);
    let month = start_of_month(today);

    let (start, end) = match range {
        NamedRange::Today => (today, add_days(today, 1)),
        NamedRange::Yesterday => (add_days(today, -1), today),
        NamedRange::Tomorrow => (add_days(today, 1), add_days(today, 2)),
        NamedRange::ThisWeek => (week, add_days(week, 7)),
        NamedRange::LastWeek => (add_days(week, -7), week),
        NamedRange::NextWeek => (add_days(week, 7), add_days(week, 14)),
        NamedRange::ThisMonth => (month, shift_months(month, 1)),
        NamedRange::LastMonth => (shift_months(month, -1), month),
        NamedRange::NextMonth => (shift_months(month, 1), shift_months(month, 2)),
    };

    DateWindow {
        label: range.label().to_string(),
        start: local_midnight(&tz, start),
        end: local_midnight(&tz, end),
    }
}

/// Resolves two `YYYY-MM-DD` inputs into a window covering both days fully.
pub fn resolve_custom<Tz: TimeZone>(
    start_input: &str,
    end_input: &str,
    tz: &Tz,
) -> Result<DateWindow, ForecastError> {
    let start = parse_date(start_input)?;
    let end = parse_date(end_input)?;

    if start > end {
        return Err(ForecastError::InvalidRange { start, end });
    }

    Ok(DateWindow {
        label: format!(
            "Custom: {} - {}",
            start.format("%b %-d"),
            end.format("%b %-d")
        ),
        start: local_midnight(tz, start),
        end: local_midnight(tz, add_days(end, 1)),
    })
}

fn parse_date(input: &str) -> Result<NaiveDate, ForecastError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ForecastError::InvalidDate(input.to_string()))
}

/// UTC instant of local midnight starting `date`. Falls back to the first
/// valid instant when midnight is skipped by a DST transition.
pub(crate) fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Ceiling of `delta / unit_ms`, correct for negative deltas too.
pub(crate) fn ceil_div(delta: TimeDelta, unit_ms: i64) -> i64 {
    let ms = delta.num_milliseconds();
    ms.div_euclid(unit_ms) + i64::from(ms.rem_euclid(unit_ms) != 0)
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

fn shift_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.unwrap_or(date)
}
