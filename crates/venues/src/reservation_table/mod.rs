//! Reservation-table booking engine.
//!
//! Several venues run the same self-service booking site: a guest account
//! logs in through `LoginForm[...]` and the short reservation view renders
//! one table row per court with a cell per half hour. Free cells carry
//! `booking-slot-available` and a link with the slot time in `data-time`.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use padeltime_availability::{AvailabilityError, AvailabilityProvider, CourtAvailability, TimeSlot};

use crate::catalog::{LoginCredentials, VenueInfo};
use crate::http;
use crate::pricing::{self, ColorPrices};

const RESERVATION_PATH: &str = "/reservation/short";

lazy_static! {
    static ref AVAILABLE_CELL: Selector =
        Selector::parse("td.booking-slot-available").expect("Invalid selector");
    static ref SLOT_LINK: Selector = Selector::parse("a[data-time]").expect("Invalid selector");
    static ref COURT_LABEL: Selector =
        Selector::parse("td.rbt-sticky-col span").expect("Invalid selector");
}

/// Where the engine lives and how to reach a venue's table.
#[derive(Clone, Debug)]
pub struct ReservationSite {
    pub base_url: String,
    /// Path the login form posts to. Some installs accept it on `/`.
    pub login_path: &'static str,
    /// Selects the venue on multi-venue installs.
    pub place_id: Option<u32>,
}

/// Provider for venues on the reservation-table engine.
pub struct ReservationTableProvider {
    venue: VenueInfo,
    site: ReservationSite,
    credentials: LoginCredentials,
}

impl ReservationTableProvider {
    pub fn new(venue: VenueInfo, site: ReservationSite, credentials: LoginCredentials) -> Self {
        Self {
            venue,
            site,
            credentials,
        }
    }

    fn login_url(&self) -> String {
        format!("{}{}", self.site.base_url, self.site.login_path)
    }

    fn reservation_url(&self, date: NaiveDate) -> String {
        reservation_url(&self.site, date)
    }
}

/// The engine wants the date without zero padding, e.g. `2026-2-5`.
fn reservation_url(site: &ReservationSite, date: NaiveDate) -> String {
    let date = format!("{}-{}-{}", date.year(), date.month(), date.day());
    match site.place_id {
        Some(place_id) => format!(
            "{}{}?iPlaceId={}&sDate={}",
            site.base_url, RESERVATION_PATH, place_id, date
        ),
        None => format!("{}{}?sDate={}", site.base_url, RESERVATION_PATH, date),
    }
}

#[async_trait]
impl AvailabilityProvider for ReservationTableProvider {
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
        // Fresh session per fetch.
        let client = http::client(id, true)?;

        let response = client
            .post(self.login_url())
            .form(&[
                ("LoginForm[var_login]", self.credentials.login.as_str()),
                ("LoginForm[var_password]", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| http::request_error(id, e))?;
        http::ensure_success(id, "Login", response)?;

        let url = self.reservation_url(date);
        debug!("{}: loading {}", id, url);
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error(id, e))?;
        let response = http::ensure_success(id, "Reservation table", response)?;
        let html = http::body_text(id, response).await?;

        let document = Html::parse_document(&html);
        let slots = parse_booking_slots(&document, &pricing::legend_prices(&document));

        Ok(self.venue.availability(date).with_slots(slots))
    }
}

/// Free slots in a reservation-table document.
///
/// The court is the label in the row's sticky first column. Prices come from
/// the cell color when `prices` knows it.
pub(crate) fn parse_booking_slots(document: &Html, prices: &ColorPrices) -> Vec<TimeSlot> {
    let mut slots = Vec::new();

    for cell in document.select(&AVAILABLE_CELL) {
        let Some(raw_time) = cell
            .select(&SLOT_LINK)
            .next()
            .and_then(|link| link.value().attr("data-time"))
        else {
            continue;
        };
        let Some(time) = TimeSlot::parse_time(raw_time) else {
            debug!("Skipping slot with unreadable time '{}'", raw_time);
            continue;
        };

        let mut slot = TimeSlot::new(time);
        if let Some(court) = court_of(&cell) {
            slot = slot.with_court(court);
        }
        if let Some(price) = pricing::slot_price(&cell, prices) {
            slot = slot.with_price(price);
        }
        slots.push(slot);
    }

    slots
}

fn court_of(cell: &ElementRef<'_>) -> Option<String> {
    let row = cell
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "tr")?;
    let label = row.select(&COURT_LABEL).next()?;
    let court = label.text().collect::<String>().trim().to_string();
    (!court.is_empty()).then_some(court)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    const TABLE: &str = r##"
        <div class="legend-item"><span style="background-color: #b9e5fb"></span>24 €</div>
        <table class="rbt-table">
          <tbody>
            <tr>
              <td class="rbt-sticky-col"><span> Court 1 </span></td>
              <td class="booking-slot-available" style="background-color: #b9e5fb">
                <a href="#" data-time="08:00">+</a>
              </td>
              <td class="booking-slot-busy"><a href="#" data-time="08:30">x</a></td>
              <td class="booking-slot-available"><a href="#" data-time="09:00">+</a></td>
            </tr>
            <tr>
              <td class="rbt-sticky-col"><span>Court 2</span></td>
              <td class="booking-slot-available"><a href="#">+</a></td>
              <td class="booking-slot-available"><a href="#" data-time="21:30:00">+</a></td>
            </tr>
          </tbody>
        </table>"##;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_booking_slots() {
        let document = Html::parse_document(TABLE);
        let slots = parse_booking_slots(&document, &pricing::legend_prices(&document));

        assert_eq!(
            slots,
            vec![
                TimeSlot::new(t(8, 0))
                    .with_court("Court 1")
                    .with_price(dec!(12)),
                TimeSlot::new(t(9, 0)).with_court("Court 1"),
                TimeSlot::new(t(21, 30)).with_court("Court 2"),
            ]
        );
    }

    #[test]
    fn test_slot_without_row_label_has_no_court() {
        let document = Html::parse_document(
            r#"<table><tr><td class="booking-slot-available"><a data-time="10:00"></a></td></tr></table>"#,
        );
        let slots = parse_booking_slots(&document, &ColorPrices::new());
        assert_eq!(slots, vec![TimeSlot::new(t(10, 0))]);
    }

    #[test]
    fn test_reservation_url() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let mut site = ReservationSite {
            base_url: "https://booking.example".to_string(),
            login_path: "/user/login",
            place_id: None,
        };
        assert_eq!(
            reservation_url(&site, date),
            "https://booking.example/reservation/short?sDate=2026-2-5"
        );

        site.place_id = Some(4);
        assert_eq!(
            reservation_url(&site, date),
            "https://booking.example/reservation/short?iPlaceId=4&sDate=2026-2-5"
        );
    }
}
