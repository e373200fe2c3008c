//! Timetable booking engine.
//!
//! The timetable endpoint takes the date as a form post and answers with
//! `{"data": "<html>"}`. Depending on the install the HTML is either a
//! reservation table (see [`crate::reservation_table`]) or a plain desktop
//! table with the court in a row header and one `td[data-time]` per slot.

use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use padeltime_availability::{AvailabilityError, AvailabilityProvider, CourtAvailability, TimeSlot};

use crate::catalog::VenueInfo;
use crate::http;
use crate::pricing::{self, ColorPrices};
use crate::reservation_table::parse_booking_slots;

const TIMETABLE_PATH: &str = "/lt/timetable";

/// Hourly prices used when the page has neither legend nor descriptions.
const FALLBACK_PRICES: [(&str, i64); 2] = [("#b9e5fb", 24), ("#8dd8f8", 38)];

lazy_static! {
    static ref AVAILABLE_CELL: Selector =
        Selector::parse("td.booking-slot-available").expect("Invalid selector");
    static ref DESKTOP_TABLE: Selector = Selector::parse("table.desktop").expect("Invalid selector");
    static ref ANY_TABLE: Selector = Selector::parse("table").expect("Invalid selector");
    static ref BODY_ROW: Selector = Selector::parse("tbody > tr").expect("Invalid selector");
    static ref ROW_HEADER: Selector = Selector::parse("th").expect("Invalid selector");
    static ref CELL: Selector = Selector::parse("td").expect("Invalid selector");
}

#[derive(Debug, Deserialize)]
struct TimetablePayload {
    data: String,
}

/// Provider for venues on the timetable engine.
pub struct TimetableProvider {
    venue: VenueInfo,
    base_url: String,
}

impl TimetableProvider {
    pub fn new(venue: VenueInfo, base_url: impl Into<String>) -> Self {
        Self {
            venue,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AvailabilityProvider for TimetableProvider {
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
        let date_for = date.format("%Y-%m-%d").to_string();

        let response = client
            .post(format!("{}{}", self.base_url, TIMETABLE_PATH))
            .form(&[("dateFor", date_for.as_str())])
            .send()
            .await
            .map_err(|e| http::request_error(id, e))?;
        let response = http::ensure_success(id, "POST", response)?;
        let raw = http::body_text(id, response).await?;

        let slots = parse_timetable(&unwrap_payload(raw));
        debug!("{}: {} free slots on {}", id, slots.len(), date);

        Ok(self.venue.availability(date).with_slots(slots))
    }
}

/// The HTML inside `{"data": ...}`, or the body itself when it is not JSON.
fn unwrap_payload(raw: String) -> String {
    match serde_json::from_str::<TimetablePayload>(&raw) {
        Ok(payload) => payload.data,
        Err(_) => raw,
    }
}

/// Free slots in a timetable document.
pub(crate) fn parse_timetable(html: &str) -> Vec<TimeSlot> {
    let document = Html::parse_document(html);
    let prices = prices_for(&document);

    let slots = parse_booking_slots(&document, &prices);
    if !slots.is_empty() {
        return slots;
    }
    parse_desktop_table(&document, &prices)
}

/// Legend first, then pricing descriptions, then the fixed fallback when the
/// page is a reservation table without any price hints.
fn prices_for(document: &Html) -> ColorPrices {
    let prices = pricing::legend_prices(document);
    if !prices.is_empty() {
        return prices;
    }
    let prices = pricing::time_description_prices(document);
    if !prices.is_empty() {
        return prices;
    }
    if document.select(&AVAILABLE_CELL).next().is_some() {
        return FALLBACK_PRICES
            .iter()
            .map(|(color, price)| (color.to_string(), Decimal::from(*price)))
            .collect();
    }
    ColorPrices::new()
}

fn parse_desktop_table(document: &Html, prices: &ColorPrices) -> Vec<TimeSlot> {
    let Some(table) = document
        .select(&DESKTOP_TABLE)
        .next()
        .or_else(|| document.select(&ANY_TABLE).next())
    else {
        return Vec::new();
    };

    let mut slots = Vec::new();
    for row in table.select(&BODY_ROW) {
        let court = row
            .select(&ROW_HEADER)
            .next()
            .map(|th| th.text().map(str::trim).collect::<String>())
            .unwrap_or_default();
        if court.is_empty() {
            continue;
        }

        for cell in row.select(&CELL) {
            if cell.value().classes().any(|class| class == "not-available") {
                continue;
            }
            let Some(time) = cell
                .value()
                .attr("data-time")
                .and_then(TimeSlot::parse_time)
            else {
                continue;
            };

            let mut slot = TimeSlot::new(time).with_court(court.clone());
            if let Some(price) = pricing::slot_price(&cell, prices) {
                slot = slot.with_price(price);
            }
            slots.push(slot);
        }
    }
    slots
}
