//! Access window evaluation.
//!
//! Every comparison happens on naive civil date-times in one fixed timezone.
//! [`CivilClock`] converts a UTC instant to that civil form once, at the
//! edge; [`Schedule`] never sees an offset. Comparing date-only values in UTC
//! shifts window boundaries by the offset, which is the bug this split avoids.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage and wire format for civil dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for civil times of day.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Storage format for combined civil date-times.
///
/// Zero padded, so the text sorts in chronological order. The SQL lifecycle
/// transitions compare `date || ' ' || time` against values in this format.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How an access window repeats inside its date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// One continuous span from start to end.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse a stored value. Unrecognized values read as [`Recurrence::None`].
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::None)
    }

    const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(Error::InvalidSchedule(format!(
                "unknown recurrence '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The time-boxed window of an access permit, in civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Recurrence,
}

impl Schedule {
    /// Parse client input strictly and validate the window.
    pub fn parse(
        start_date: &str,
        end_date: &str,
        start_time: &str,
        end_time: &str,
        recurrence: &str,
    ) -> Result<Self> {
        let schedule = Self {
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
            start_time: parse_time(start_time)?,
            end_time: parse_time(end_time)?,
            recurrence: recurrence.parse()?,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Rebuild a schedule from stored columns.
    ///
    /// Window bounds are not re-validated and an unrecognized recurrence is
    /// read as `none`, so a record that slipped through stays evaluable.
    pub fn from_stored(
        start_date: &str,
        end_date: &str,
        start_time: &str,
        end_time: &str,
        recurrence: &str,
    ) -> Result<Self> {
        Ok(Self {
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
            start_time: parse_time(start_time)?,
            end_time: parse_time(end_time)?,
            recurrence: Recurrence::parse_lenient(recurrence),
        })
    }

    /// Check the creation-time invariants.
    ///
    /// The end boundary must not precede the start boundary. Recurring
    /// windows repeat within one day, so they also need `start_time <= end_time`.
    pub fn validate(&self) -> Result<()> {
        if self.closes_at() < self.opens_at() {
            return Err(Error::InvalidSchedule(format!(
                "window ends ({}) before it starts ({})",
                self.closes_at().format(DATETIME_FORMAT),
                self.opens_at().format(DATETIME_FORMAT)
            )));
        }
        if self.recurrence.is_recurring() && self.end_time < self.start_time {
            return Err(Error::InvalidSchedule(format!(
                "{} window ends at {} before it starts at {}",
                self.recurrence,
                self.end_time.format(TIME_FORMAT),
                self.start_time.format(TIME_FORMAT)
            )));
        }
        Ok(())
    }

    /// First civil instant of the window.
    pub fn opens_at(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    /// Last civil instant of the window, whatever the recurrence.
    pub fn closes_at(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    /// Whether an access with this schedule admits entry at civil time `now`.
    ///
    /// Both boundaries are inclusive.
    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        let date = now.date();
        if date < self.start_date || date > self.end_date {
            return false;
        }

        if !self.recurrence.is_recurring() {
            return self.opens_at() <= now && now <= self.closes_at();
        }

        // Same-day window; an inverted one admits nothing.
        if self.end_time < self.start_time {
            return false;
        }
        let time = now.time();
        self.occurs_on(date) && self.start_time <= time && time <= self.end_time
    }

    fn occurs_on(&self, date: NaiveDate) -> bool {
        match self.recurrence {
            Recurrence::None | Recurrence::Daily => true,
            Recurrence::Weekly => date.weekday() == self.start_date.weekday(),
            // A start on the 31st skips shorter months.
            Recurrence::Monthly => date.day() == self.start_date.day(),
        }
    }
}

/// Converts real instants into the configured civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilClock {
    offset: FixedOffset,
}

impl CivilClock {
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse `+HH:MM`, `-HH:MM` or `Z`.
    pub fn from_offset_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
            return Ok(Self::new(Self::UTC));
        }

        let invalid = || Error::Config(format!("invalid UTC offset '{value}', expected +HH:MM"));

        let (sign, rest) = match value.as_bytes().first() {
            Some(b'+') => (1, &value[1..]),
            Some(b'-') => (-1, &value[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::new)
            .ok_or_else(invalid)
    }

    const UTC: FixedOffset = match FixedOffset::east_opt(0) {
        Some(offset) => offset,
        None => unreachable!(),
    };

    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Civil date-time for `instant`, truncated to whole seconds.
    pub fn to_civil(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let local = instant.with_timezone(&self.offset).naive_local();
        local.with_nanosecond(0).unwrap_or(local)
    }

    /// Civil date-time right now.
    pub fn now(&self) -> NaiveDateTime {
        self.to_civil(Utc::now())
    }
}

impl Default for CivilClock {
    fn default() -> Self {
        Self::new(Self::UTC)
    }
}

/// Parse a `YYYY-MM-DD` civil date.
///
/// Years are limited to four digits so stored dates keep sorting as text.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| Error::InvalidSchedule(format!("invalid date '{value}': {e}")))?;
    if !(0..=9999).contains(&date.year()) {
        return Err(Error::InvalidSchedule(format!(
            "invalid date '{value}': year must have four digits"
        )));
    }
    Ok(date)
}

/// Parse an `HH:MM` or `HH:MM:SS` civil time of day.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| Error::InvalidSchedule(format!("invalid time '{value}': {e}")))
}

/// Render a civil date-time in [`DATETIME_FORMAT`].
pub fn format_civil(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}
