//! Court-by-time grid for one venue.

use std::collections::HashSet;

use chrono::NaiveTime;
use serde::Serialize;

use crate::models::CourtAvailability;

/// Label used for slots whose provider does not name a court.
pub const UNNAMED_COURT: &str = "Court";

/// One court row of the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtRow {
    pub court: String,
    /// One flag per requested column, in column order.
    pub cells: Vec<bool>,
}

/// Courts of a venue and which (court, time) pairs are free.
#[derive(Clone, Debug, Default)]
pub struct VenueTable {
    courts: Vec<String>,
    free: HashSet<(String, NaiveTime)>,
}

impl VenueTable {
    /// Courts in the order they first appear in the slot list.
    pub fn courts(&self) -> &[String] {
        &self.courts
    }

    pub fn is_available(&self, court: &str, time: NaiveTime) -> bool {
        self.free.contains(&(court.to_string(), time))
    }

    /// Lay the table out against a set of time columns.
    pub fn rows(&self, columns: &[NaiveTime]) -> Vec<CourtRow> {
        self.courts
            .iter()
            .map(|court| CourtRow {
                court: court.clone(),
                cells: columns
                    .iter()
                    .map(|time| self.is_available(court, *time))
                    .collect(),
            })
            .collect()
    }
}

impl From<&CourtAvailability> for VenueTable {
    fn from(availability: &CourtAvailability) -> Self {
        let mut table = VenueTable::default();
        for slot in &availability.slots {
            let court = slot.court.as_deref().unwrap_or(UNNAMED_COURT);
            if !table.courts.iter().any(|c| c == court) {
                table.courts.push(court.to_string());
            }
            table.free.insert((court.to_string(), slot.time));
        }
        table
    }
}
