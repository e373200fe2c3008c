//! Date admission policy.
//!
//! Only today through `today + span_days` (inclusive) in the reference
//! timezone can be served. Checking this before anything else keeps cache
//! and rate limiter state bounded by the number of providers times
//! `span_days + 1`.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::errors::AvailabilityError;

/// Reference timezone of the venues.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Vilnius;

/// Days after today that can still be requested.
pub const DEFAULT_SPAN_DAYS: u32 = 6;

/// The servable date range, anchored on "today" in a fixed timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    timezone: Tz,
    span_days: u32,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE, DEFAULT_SPAN_DAYS)
    }
}

impl DateWindow {
    pub fn new(timezone: Tz, span_days: u32) -> Self {
        Self {
            timezone,
            span_days,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn span_days(&self) -> u32 {
        self.span_days
    }

    pub fn today(&self) -> NaiveDate {
        self.today_at(Utc::now())
    }

    /// Calendar date of `now` in the reference timezone.
    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Wall-clock time of `now` in the reference timezone.
    pub fn local_time_at(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.timezone).time()
    }

    pub fn last_day_at(&self, now: DateTime<Utc>) -> NaiveDate {
        self.today_at(now)
            .checked_add_days(Days::new(u64::from(self.span_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains_at(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        date >= self.today_at(now) && date <= self.last_day_at(now)
    }

    /// Admit `date` or reject it with [`AvailabilityError::DateOutOfRange`].
    pub fn admit(&self, date: NaiveDate) -> Result<NaiveDate, AvailabilityError> {
        self.admit_at(date, Utc::now())
    }

    pub fn admit_at(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<NaiveDate, AvailabilityError> {
        if self.contains_at(date, now) {
            Ok(date)
        } else {
            Err(AvailabilityError::DateOutOfRange {
                date,
                first: self.today_at(now),
                last: self.last_day_at(now),
            })
        }
    }

    /// Parse an ISO date (`YYYY-MM-DD`) and admit it.
    ///
    /// A missing or blank value means today.
    pub fn parse_and_admit(&self, raw: Option<&str>) -> Result<NaiveDate, AvailabilityError> {
        self.parse_and_admit_at(raw, Utc::now())
    }

    pub fn parse_and_admit_at(
        &self,
        raw: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<NaiveDate, AvailabilityError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(self.today_at(now)),
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| AvailabilityError::InvalidDate(raw.to_string()))?;
                self.admit_at(date, now)
            }
        }
    }

    /// Every servable date, today first.
    pub fn days_at(&self, now: DateTime<Utc>) -> Vec<NaiveDate> {
        self.today_at(now)
            .iter_days()
            .take(self.span_days as usize + 1)
            .collect()
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.days_at(Utc::now())
    }
}
