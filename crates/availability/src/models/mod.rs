//! Availability models
//!
//! This module contains the core data types the engine moves around:
//! - `types` - Type aliases and the cache key
//! - `slot` - A single bookable time slot (TimeSlot)
//! - `availability` - One venue's slots for one date (CourtAvailability)
//! - `outcome` - Per-provider result of a fetch (ProviderOutcome, ProviderFailure)

mod availability;
mod outcome;
mod slot;
mod types;

pub use availability::CourtAvailability;
pub use outcome::{ProviderFailure, ProviderOutcome};
pub use slot::TimeSlot;
pub use types::{CacheKey, ProviderId};
