use chrono::NaiveDate;
use padeltime_availability::cache::CacheStats;
use padeltime_availability::view::{CourtRow, EffectiveFloor};
use padeltime_availability::{AvailabilityProvider, ProviderOutcome};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub url: String,
    pub image: Option<String>,
}

impl From<&dyn AvailabilityProvider> for Venue {
    fn from(provider: &dyn AvailabilityProvider) -> Self {
        Self {
            id: provider.id().to_string(),
            name: provider.name().to_string(),
            url: provider.url().to_string(),
            image: provider.image().map(str::to_string),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DatesResponse {
    pub timezone: String,
    #[schema(value_type = String)]
    pub today: NaiveDate,
    #[schema(value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// `YYYY-MM-DD`, defaults to today
    pub date: Option<String>,
    /// `HH:MM` or `all`
    pub from: Option<String>,
    /// Restrict to one venue id
    pub venue: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct RefreshQuery {
    /// `YYYY-MM-DD`, defaults to today
    pub date: Option<String>,
}

/// One venue's outcome plus its court grid.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VenueAvailability {
    #[serde(flatten)]
    pub outcome: ProviderOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub courts: Vec<CourtRow>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    #[schema(value_type = String)]
    pub date: NaiveDate,
    /// True when every requested venue was served from cache.
    pub cached: bool,
    #[schema(value_type = Object)]
    pub floor: EffectiveFloor,
    /// Half-hour grid columns (`HH:MM`)
    pub columns: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub venues: Vec<VenueAvailability>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[schema(value_type = String)]
    pub date: NaiveDate,
    pub invalidated: usize,
    #[schema(value_type = Vec<Object>)]
    pub venues: Vec<ProviderOutcome>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[schema(value_type = Object)]
    pub cache: CacheStats,
    pub cached_entries: usize,
    pub in_flight: usize,
    pub tracked_clients: usize,
}
