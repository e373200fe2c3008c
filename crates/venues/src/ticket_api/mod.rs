//! Ticket API booking engine.
//!
//! The engine exposes every court ticket of a location for a day as JSON.
//! Tickets with status `free` are bookable. Prices are in cents.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use padeltime_availability::{AvailabilityError, AvailabilityProvider, CourtAvailability, TimeSlot};

use crate::catalog::VenueInfo;
use crate::http;

const TICKETS_PATH: &str = "/api/v1/settings/tickets/user";
const FREE_STATUS: &str = "free";
const PAGE_SIZE: &str = "2000";

#[derive(Debug, Default, Deserialize)]
struct TicketPage {
    #[serde(default)]
    content: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticket {
    #[serde(default)]
    status: Option<String>,
    /// "06:00:00"
    #[serde(default)]
    ticket_time: Option<String>,
    #[serde(default)]
    court: Option<Court>,
    /// Cents
    #[serde(default)]
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct Court {
    #[serde(default)]
    name: Option<String>,
}

/// Location of a venue inside the ticket API.
#[derive(Clone, Debug)]
pub struct TicketLocation {
    pub base_url: String,
    pub location_id: u32,
    pub city_id: u32,
}

/// Provider for venues on the ticket API.
pub struct TicketApiProvider {
    venue: VenueInfo,
    location: TicketLocation,
}

impl TicketApiProvider {
    pub fn new(venue: VenueInfo, location: TicketLocation) -> Self {
        Self { venue, location }
    }
}

#[async_trait]
impl AvailabilityProvider for TicketApiProvider {
    fn id(&self) -> &str {
        &self.venue.id
    }

    fn name(&self) -> &str {
        &self.venue.name
    }

    fn url(&self) -> &str {
        &self.venue.url
    }

    fn image(&self) -> Option<&str> {
        self.venue.image.as_deref()
    }

    async fn fetch(&self, date: NaiveDate) -> Result<CourtAvailability, AvailabilityError> {
        let id = self.id();
        let client = http::client(id, false)?;
        let day = date.format("%Y-%m-%d").to_string();
        let ticket_from = format!("{} 00:00:00", day);
        let ticket_to = format!("{} 23:59:00", day);
        let location_id = self.location.location_id.to_string();
        let city_id = self.location.city_id.to_string();

        let response = client
            .get(format!("{}{}", self.location.base_url, TICKETS_PATH))
            .query(&[
                ("page", "0"),
                ("size", PAGE_SIZE),
                ("ticketFrom", ticket_from.as_str()),
                ("ticketTo", ticket_to.as_str()),
                ("locationIds", location_id.as_str()),
                ("sportTypes", "padel"),
                ("isAuthorized", "true"),
                ("isAllCity", "false"),
                ("showSingle", "false"),
                ("cityId", city_id.as_str()),
                ("isTrainer", "false"),
            ])
            .send()
            .await
            .map_err(|e| http::request_error(id, e))?;
        let response = http::ensure_success(id, "API request", response)?;
        let body = http::body_text(id, response).await?;

        let slots = parse_tickets(&body)
            .map_err(|e| AvailabilityError::provider(id, format!("Invalid ticket list: {}", e)))?;
        debug!("{}: {} free tickets on {}", id, slots.len(), date);

        Ok(self.venue.availability(date).with_slots(slots))
    }
}

/// Free tickets in an API response, in response order.
pub(crate) fn parse_tickets(body: &str) -> Result<Vec<TimeSlot>, serde_json::Error> {
    let page: TicketPage = serde_json::from_str(body)?;

    let slots = page
        .content
        .into_iter()
        .filter(|ticket| ticket.status.as_deref() == Some(FREE_STATUS))
        .filter_map(|ticket| {
            let raw = ticket.ticket_time.as_deref()?;
            let time = TimeSlot::parse_time(raw.get(..5).unwrap_or(raw))?;

            let mut slot = TimeSlot::new(time);
            if let Some(court) = ticket
                .court
                .and_then(|court| court.name)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
            {
                slot = slot.with_court(court);
            }
            if let Some(cents) = ticket.price.filter(|cents| !cents.is_zero()) {
                slot = slot.with_price((cents / Decimal::ONE_HUNDRED).round());
            }
            Some(slot)
        })
        .collect();

    Ok(slots)
}
