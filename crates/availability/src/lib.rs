//! Padeltime Availability Crate
//!
//! Aggregation and caching engine for padel court availability. Venue
//! integrations live elsewhere and plug in through [`AvailabilityProvider`].
//!
//! # Overview
//!
//! - Fan-out to every registered provider with a per-provider timeout
//! - Failure isolation: one broken venue never hides the others
//! - TTL cache with single-flight population per (provider, date)
//! - Per-client sliding-window limit on costly actions, free for cache hits
//! - Date admission: only today..=today+span in the venues' timezone
//!
//! # Architecture
//!
//! ```text
//!   request(date, client)
//!          |
//!          v
//!   +--------------+     reject: InvalidDate / DateOutOfRange
//!   |  DateWindow  | -->
//!   +--------------+
//!          |
//!          v
//!   +-------------------+     reject: RateLimited
//!   | ClientRateLimiter | -->  (skipped for cache hits)
//!   +-------------------+
//!          |
//!          v
//!   +----------------------+
//!   | AvailabilityRegistry |  join_all over providers
//!   +----------------------+
//!          |
//!          v
//!   +------------+      +------------------------+
//!   |  TtlCache  | -->  | AvailabilityProvider   |  (timeout-bounded)
//!   +------------+      +------------------------+
//!          |
//!          v
//!   Vec<ProviderOutcome>  -->  view::filter_from / VenueTable
//! ```
//!
//! # Core Types
//!
//! - [`CourtAvailability`] - Free slots of one venue on one date
//! - [`TimeSlot`] - A bookable start time with optional court and price
//! - [`ProviderOutcome`] - Success or classified failure per provider
//! - [`AvailabilityError`] - Every error the engine produces

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod view;

pub use models::{
    CacheKey, CourtAvailability, ProviderFailure, ProviderId, ProviderOutcome, TimeSlot,
};

pub use errors::{AvailabilityError, FailureKind};

pub use provider::AvailabilityProvider;

pub use cache::{CacheStats, TtlCache};

pub use registry::{
    AvailabilityRegistry, ClientRateLimiter, DateWindow, RateLimitConfig, RegistryConfig,
};

pub use view::{TimeFloor, VenueTable};
