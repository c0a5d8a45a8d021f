//! Clock and day-window source.
//!
//! "Today" is the calendar date in the clock's time zone at the moment of asking. The day window
//! spans local 00:00:00 to 23:59:59 inclusive of that date and is expressed in UTC for store
//! filters.

use crate::{DischargeError, DischargeResult};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, SecondsFormat, TimeZone, Utc};

/// Inclusive UTC bounds of one local calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Builds the window for `date` in time zone `tz`.
    ///
    /// On a DST transition at midnight the earliest valid start and the latest valid end are used.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::InvalidDayWindow`] if neither bound exists in `tz`.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DischargeResult<Self> {
        let start_local = date
            .and_hms_opt(0, 0, 0)
            .ok_or(DischargeError::InvalidDayWindow(date))?;
        let end_local = date
            .and_hms_opt(23, 59, 59)
            .ok_or(DischargeError::InvalidDayWindow(date))?;

        let start = tz
            .from_local_datetime(&start_local)
            .earliest()
            .ok_or(DischargeError::InvalidDayWindow(date))?;
        let end = tz
            .from_local_datetime(&end_local)
            .latest()
            .ok_or(DischargeError::InvalidDayWindow(date))?;

        Ok(Self {
            date,
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Window of the current local calendar day.
    fn today(&self) -> DischargeResult<DayWindow>;
}

/// The host clock in the host's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> DischargeResult<DayWindow> {
        let today = Local::now().date_naive();
        DayWindow::for_date(today, &Local)
    }
}

/// A clock stopped at one instant, observed from a fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> DischargeResult<DayWindow> {
        let today = self.now.with_timezone(&self.offset).date_naive();
        DayWindow::for_date(today, &self.offset)
    }
}
