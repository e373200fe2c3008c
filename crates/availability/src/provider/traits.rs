//! Availability provider trait definition.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AvailabilityError;
use crate::models::CourtAvailability;

/// Trait for availability providers.
///
/// Implement this trait to add a new venue. Providers are registered on an
/// [`AvailabilityRegistry`](crate::registry::AvailabilityRegistry) before it
/// starts serving, and are fetched concurrently with each other.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use chrono::NaiveDate;
/// use padeltime_availability::{AvailabilityError, AvailabilityProvider, CourtAvailability};
///
/// struct MyVenue;
///
/// #[async_trait]
/// impl AvailabilityProvider for MyVenue {
///     fn id(&self) -> &str {
///         "my-venue"
///     }
///
///     fn name(&self) -> &str {
///         "My Venue"
///     }
///
///     fn url(&self) -> &str {
///         "https://booking.my-venue.example"
///     }
///
///     async fn fetch(&self, date: NaiveDate) -> Result<CourtAvailability, AvailabilityError> {
///         // ... call the booking system
///     }
/// }
/// ```
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Used as half of the cache key and in logs.
    fn id(&self) -> &str;

    /// Venue display name.
    fn name(&self) -> &str;

    /// Public booking URL, also shown next to failures.
    fn url(&self) -> &str;

    /// Venue logo, if any.
    fn image(&self) -> Option<&str> {
        None
    }

    /// Fetch availability for a date.
    ///
    /// Implementations do not need their own overall timeout; the registry
    /// bounds every call.
    async fn fetch(&self, date: NaiveDate) -> Result<CourtAvailability, AvailabilityError>;
}
