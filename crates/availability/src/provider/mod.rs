//! Availability provider abstraction.
//!
//! A provider is one external booking source. The engine only knows the
//! [`AvailabilityProvider`] trait; how a venue's data is obtained (HTML
//! scraping, JSON APIs) lives with the implementation.

mod traits;

pub use traits::AvailabilityProvider;
