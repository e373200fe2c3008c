//! Time floor selection and slot filtering.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::errors::AvailabilityError;
use crate::models::{ProviderOutcome, TimeSlot};

/// First column of the half-hour grid.
const FIRST_COLUMN: (u32, u32) = (6, 0);

/// Last column of the half-hour grid.
const LAST_COLUMN: (u32, u32) = (22, 30);

/// What the client asked for as the earliest time of interest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeFloor {
    /// Nothing requested. Today defaults to the current hour.
    #[default]
    Unspecified,
    /// Show the whole day.
    All,
    /// Show slots at or after this time.
    At(NaiveTime),
}

impl TimeFloor {
    /// Parse an optional query value. Missing or blank means unspecified.
    pub fn parse(raw: Option<&str>) -> Result<Self, AvailabilityError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::Unspecified),
            Some(raw) => raw.parse(),
        }
    }
}

impl FromStr for TimeFloor {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        TimeSlot::parse_time(s)
            .map(Self::At)
            .ok_or_else(|| AvailabilityError::InvalidTime(s.to_string()))
    }
}

impl fmt::Display for TimeFloor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => Ok(()),
            Self::All => write!(f, "all"),
            Self::At(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

/// The floor actually applied to a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveFloor {
    #[serde(with = "optional_hhmm")]
    pub time: Option<NaiveTime>,
    /// True when the floor was picked for the client rather than requested.
    pub auto_selected: bool,
}

/// Resolve the requested floor against the viewed date.
///
/// `now` is the wall-clock time in the reference timezone and only matters
/// when `date` is `today`.
pub fn effective_floor(
    requested: TimeFloor,
    date: NaiveDate,
    today: NaiveDate,
    now: NaiveTime,
) -> EffectiveFloor {
    match requested {
        TimeFloor::All => EffectiveFloor {
            time: None,
            auto_selected: false,
        },
        TimeFloor::At(time) => EffectiveFloor {
            time: Some(time),
            auto_selected: false,
        },
        TimeFloor::Unspecified if date == today => EffectiveFloor {
            time: NaiveTime::from_hms_opt(now.hour(), 0, 0),
            auto_selected: true,
        },
        TimeFloor::Unspecified => EffectiveFloor {
            time: None,
            auto_selected: false,
        },
    }
}

/// Copy `outcomes`, keeping only slots at or after `floor`.
///
/// Failed outcomes are passed through untouched. The input is never
/// modified, so it is safe to call on values shared with the cache.
pub fn filter_from(outcomes: &[ProviderOutcome], floor: Option<NaiveTime>) -> Vec<ProviderOutcome> {
    let Some(floor) = floor else {
        return outcomes.to_vec();
    };

    outcomes
        .iter()
        .map(|outcome| match outcome {
            ProviderOutcome::Available(availability) => {
                let mut copy = availability.clone();
                copy.slots.retain(|slot| slot.time >= floor);
                ProviderOutcome::Available(copy)
            }
            ProviderOutcome::Failed(failure) => ProviderOutcome::Failed(failure.clone()),
        })
        .collect()
}

/// Half-hour grid columns from 06:00 to 22:30, at or after `floor`.
pub fn time_columns(floor: Option<NaiveTime>) -> Vec<NaiveTime> {
    let (first_hour, first_minute) = FIRST_COLUMN;
    let (last_hour, last_minute) = LAST_COLUMN;
    let first = first_hour * 60 + first_minute;
    let last = last_hour * 60 + last_minute;

    (first..=last)
        .step_by(30)
        .filter_map(|minutes| NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0))
        .filter(|time| floor.is_none_or(|floor| *time >= floor))
        .collect()
}

mod optional_hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.collect_str(&time.format("%H:%M")),
            None => serializer.serialize_none(),
        }
    }
}
