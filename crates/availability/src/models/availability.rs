use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::slot::TimeSlot;

/// Availability for a single venue on a single date.
///
/// Produced once per fetch and never mutated afterwards; views that need a
/// narrower slot list work on a copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtAvailability {
    /// Id of the provider that produced this data
    pub provider: String,

    /// Venue display name
    pub name: String,

    /// Where a user can book
    pub url: String,

    /// Date the slots belong to
    pub date: NaiveDate,

    /// Venue logo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Available slots, in the order the venue lists them
    pub slots: Vec<TimeSlot>,

    /// When the upstream was queried
    pub fetched_at: DateTime<Utc>,
}

impl CourtAvailability {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            url: url.into(),
            date,
            image: None,
            slots: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_slots(mut self, slots: Vec<TimeSlot>) -> Self {
        self.slots = slots;
        self
    }

    pub fn available_count(&self) -> usize {
        self.slots.len()
    }

    pub fn has_availability(&self) -> bool {
        !self.slots.is_empty()
    }
}
