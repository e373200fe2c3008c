//! Padeltime Venues Crate
//!
//! Availability providers for the booking sites padeltime scrapes. Each
//! provider implements [`AvailabilityProvider`] and turns one venue's
//! booking page or API into a [`padeltime_availability::CourtAvailability`].
//!
//! # Engines
//!
//! - [`ReservationTableProvider`] - guest login followed by an HTML table
//! - [`TimetableProvider`] - form post returning an HTML fragment in JSON
//! - [`TicketApiProvider`] - JSON list of court tickets
//!
//! [`catalog::default_venues`] assembles the known venues in display order.

pub mod catalog;
pub mod pricing;
pub mod reservation_table;
pub mod ticket_api;
pub mod timetable;

mod http;

pub use catalog::{default_venues, LoginCredentials, VenueCredentials, VenueInfo};
pub use reservation_table::{ReservationSite, ReservationTableProvider};
pub use ticket_api::{TicketApiProvider, TicketLocation};
pub use timetable::TimetableProvider;

pub use padeltime_availability::AvailabilityProvider;
