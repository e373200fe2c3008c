//! The venues padeltime knows about.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use padeltime_availability::{AvailabilityProvider, CourtAvailability};

use crate::reservation_table::{ReservationSite, ReservationTableProvider};
use crate::ticket_api::{TicketApiProvider, TicketLocation};
use crate::timetable::TimetableProvider;

/// Prefix of the environment variables carrying guest logins.
pub const LOGIN_ENV_PREFIX: &str = "PT_VENUE_LOGIN_";

/// Identity of a venue as shown to users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenueInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub image: Option<String>,
}

impl VenueInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// An empty availability record for this venue.
    pub fn availability(&self, date: NaiveDate) -> CourtAvailability {
        let availability = CourtAvailability::new(&self.id, &self.name, &self.url, date);
        match &self.image {
            Some(image) => availability.with_image(image),
            None => availability,
        }
    }
}

/// Guest account for a login-based booking site.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub login: String,
    pub password: String,
}

impl LoginCredentials {
    /// Parse `login:password`. The password may itself contain `:`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (login, password) = raw.split_once(':')?;
        if login.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            login: login.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Guest logins keyed by venue id.
pub type VenueCredentials = HashMap<String, LoginCredentials>;

/// Name of the environment variable holding the login for `venue_id`.
///
/// `tennis-space` reads `PT_VENUE_LOGIN_TENNIS_SPACE`.
pub fn login_env_var(venue_id: &str) -> String {
    format!(
        "{}{}",
        LOGIN_ENV_PREFIX,
        venue_id.to_uppercase().replace('-', "_")
    )
}

/// How a venue's availability is fetched.
#[derive(Clone, Debug)]
pub enum Engine {
    /// Login plus reservation table.
    ReservationTable(ReservationSite),
    /// Timetable form post, base URL.
    Timetable(String),
    /// Ticket API.
    TicketApi(TicketLocation),
}

/// One venue and the engine behind it.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub info: VenueInfo,
    pub engine: Engine,
}

impl CatalogEntry {
    /// Build the provider, or `None` when a login is needed but missing.
    pub fn into_provider(
        self,
        credentials: &VenueCredentials,
    ) -> Option<Arc<dyn AvailabilityProvider>> {
        match self.engine {
            Engine::ReservationTable(site) => {
                let Some(login) = credentials.get(&self.info.id) else {
                    warn!(
                        "No login for venue '{}', set {} to enable it",
                        self.info.id,
                        login_env_var(&self.info.id)
                    );
                    return None;
                };
                Some(Arc::new(ReservationTableProvider::new(
                    self.info,
                    site,
                    login.clone(),
                )))
            }
            Engine::Timetable(base_url) => {
                Some(Arc::new(TimetableProvider::new(self.info, base_url)))
            }
            Engine::TicketApi(location) => {
                Some(Arc::new(TicketApiProvider::new(self.info, location)))
            }
        }
    }
}

fn reservation_site(base_url: &str, login_path: &'static str, place_id: Option<u32>) -> Engine {
    Engine::ReservationTable(ReservationSite {
        base_url: base_url.to_string(),
        login_path,
        place_id,
    })
}

/// Every known venue, in display order.
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            info: VenueInfo::new(
                "a1-padel",
                "A1 Padel",
                "https://savitarna.a1padel.lt/reservation/short",
            )
            .with_image("https://a1padel.lt/wp-content/uploads/2024/02/a1padel_green.svg"),
            engine: reservation_site("https://savitarna.a1padel.lt", "/user/login", None),
        },
        CatalogEntry {
            info: VenueInfo::new(
                "skycop-padel",
                "Skycop Padel",
                "https://savitarna.padelionamai.lt/reservation/short",
            )
            .with_image("https://padelionamai.lt/wp-content/uploads/2021/05/main-logo.png"),
            engine: reservation_site("https://savitarna.padelionamai.lt", "", Some(4)),
        },
        CatalogEntry {
            info: VenueInfo::new("4padel-arena", "4Padel Arena", "https://4padelarena.lt")
                .with_image(
                    "https://4padelarena.lt/wp-content/uploads/2024/02/4-PADEL-ARENA_logo_2023_B-2-166x73.png",
                ),
            engine: Engine::TicketApi(TicketLocation {
                base_url: "https://activezone.fun".to_string(),
                location_id: 189,
                city_id: 3,
            }),
        },
        CatalogEntry {
            info: VenueInfo::new(
                "bsport-arena",
                "Bsport Arena",
                "https://savitarna.bsport.lt/reservation/short",
            )
            .with_image("https://savitarna.bsport.lt/themes/bsport_arena/images/bsport_logo.png"),
            engine: reservation_site("https://savitarna.bsport.lt", "", Some(2)),
        },
        CatalogEntry {
            info: VenueInfo::new(
                "tennis-space",
                "Tennis Space",
                "https://savitarna.tennisspace.lt/reservation/short",
            )
            .with_image(
                "https://savitarna.tennisspace.lt/themes/tennis_space/images/logo-colored.svg",
            ),
            engine: reservation_site("https://savitarna.tennisspace.lt", "/user/login", Some(4)),
        },
        CatalogEntry {
            info: VenueInfo::new("padel-house", "Padel House", "https://rezervacija.padelhouse.lt")
                .with_image("https://rezervacija.padelhouse.lt/build/images/logo-full.png"),
            engine: Engine::Timetable("https://rezervacija.padelhouse.lt".to_string()),
        },
    ]
}

/// Ids of every venue in the catalog, in display order.
pub fn venue_ids() -> Vec<String> {
    catalog().into_iter().map(|entry| entry.info.id).collect()
}

/// Build the provider list in display order.
///
/// Login-based venues without credentials are skipped with a warning.
pub fn default_venues(credentials: &VenueCredentials) -> Vec<Arc<dyn AvailabilityProvider>> {
    let venues: Vec<_> = catalog()
        .into_iter()
        .filter_map(|entry| entry.into_provider(credentials))
        .collect();
    info!("Venue catalog: {} venues enabled", venues.len());
    venues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> LoginCredentials {
        LoginCredentials::parse("guest:secret").unwrap()
    }

    #[test]
    fn test_parse_credentials() {
        let parsed = LoginCredentials::parse("guest:pa:ss").unwrap();
        assert_eq!(parsed.login, "guest");
        assert_eq!(parsed.password, "pa:ss");

        assert!(LoginCredentials::parse("guest").is_none());
        assert!(LoginCredentials::parse(":secret").is_none());
        assert!(LoginCredentials::parse("guest:").is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let printed = format!("{:?}", login());
        assert!(printed.contains("guest"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_login_env_var() {
        assert_eq!(login_env_var("tennis-space"), "PT_VENUE_LOGIN_TENNIS_SPACE");
        assert_eq!(login_env_var("a1-padel"), "PT_VENUE_LOGIN_A1_PADEL");
    }

    #[test]
    fn test_venues_without_logins() {
        let venues = default_venues(&VenueCredentials::new());
        let ids: Vec<_> = venues.iter().map(|v| v.id().to_string()).collect();
        assert_eq!(ids, vec!["4padel-arena", "padel-house"]);
    }

    #[test]
    fn test_all_venues_in_display_order() {
        let credentials: VenueCredentials = venue_ids()
            .into_iter()
            .map(|id| (id, login()))
            .collect();
        let venues = default_venues(&credentials);
        let ids: Vec<_> = venues.iter().map(|v| v.id().to_string()).collect();

        assert_eq!(ids, venue_ids());
        assert_eq!(
            ids,
            vec![
                "a1-padel",
                "skycop-padel",
                "4padel-arena",
                "bsport-arena",
                "tennis-space",
                "padel-house",
            ]
        );
        assert!(venues.iter().all(|v| v.image().is_some()));
    }

    #[test]
    fn test_venue_availability_carries_identity() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let info = VenueInfo::new("x", "X Padel", "https://x").with_image("https://x/logo.png");
        let availability = info.availability(date);

        assert_eq!(availability.provider, "x");
        assert_eq!(availability.name, "X Padel");
        assert_eq!(availability.image.as_deref(), Some("https://x/logo.png"));
        assert!(availability.slots.is_empty());
    }
}
