use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use padeltime_availability::view::{effective_floor, filter_from, time_columns, TimeFloor};
use padeltime_availability::{AvailabilityError, ProviderOutcome, VenueTable};
use tracing::{debug, info};

use crate::{
    api::client::ClientId,
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{
        AvailabilityQuery, AvailabilityResponse, DatesResponse, RefreshQuery, RefreshResponse,
        StatsResponse, Venue, VenueAvailability,
    },
};

#[utoipa::path(get, path = "/api/v1/venues", responses((status = 200, body = [Venue])))]
pub async fn list_venues(State(state): State<Arc<AppState>>) -> Json<Vec<Venue>> {
    let venues = state
        .registry
        .providers()
        .iter()
        .map(|provider| Venue::from(provider.as_ref()))
        .collect();
    Json(venues)
}

#[utoipa::path(get, path = "/api/v1/dates", responses((status = 200, body = DatesResponse)))]
pub async fn list_dates(State(state): State<Arc<AppState>>) -> Json<DatesResponse> {
    let now = Utc::now();
    Json(DatesResponse {
        timezone: state.window.timezone().name().to_string(),
        today: state.window.today_at(now),
        dates: state.window.days_at(now),
    })
}

/// Spend budget for a costly action, or refuse with 429.
fn charge(state: &AppState, client: &ClientId, is_cache_hit: bool) -> ApiResult<()> {
    if state.limiter.allow(client.as_str(), is_cache_hit) {
        return Ok(());
    }
    let retry_after = state.limiter.retry_after(client.as_str());
    info!(
        "Rate limited client {} (retry after {:?})",
        client.as_str(),
        retry_after
    );
    Err(ApiError::rate_limited(client.as_str(), retry_after))
}

#[utoipa::path(
    get,
    path = "/api/v1/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, body = AvailabilityResponse),
        (status = 400, description = "Invalid or out-of-range date, or invalid time"),
        (status = 404, description = "Unknown venue"),
        (status = 429, description = "Action budget spent"),
    )
)]
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    client: ClientId,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let now = Utc::now();
    let date = state.window.parse_and_admit_at(query.date.as_deref(), now)?;
    let requested_floor = TimeFloor::parse(query.from.as_deref())?;

    let venue = query
        .venue
        .as_deref()
        .map(str::trim)
        .filter(|venue| !venue.is_empty());
    if let Some(venue) = venue {
        if state.registry.provider(venue).is_none() {
            return Err(AvailabilityError::UnknownProvider(venue.to_string()).into());
        }
    }

    let cached = match venue {
        Some(venue) => state.registry.is_provider_cached(venue, date),
        None => state.registry.is_cached(date),
    };
    charge(&state, &client, cached)?;

    let outcomes = match venue {
        Some(venue) => vec![state.registry.fetch_one(venue, date).await?],
        None => state.registry.fetch_all(date).await,
    };

    let floor = effective_floor(
        requested_floor,
        date,
        state.window.today_at(now),
        state.window.local_time_at(now),
    );
    let columns = time_columns(floor.time);
    debug!(
        "Availability for {} from {:?} (cached: {})",
        date, floor.time, cached
    );

    let venues = filter_from(&outcomes, floor.time)
        .into_iter()
        .map(|outcome| {
            let courts = match &outcome {
                ProviderOutcome::Available(availability) => {
                    VenueTable::from(availability).rows(&columns)
                }
                ProviderOutcome::Failed(_) => Vec::new(),
            };
            VenueAvailability { outcome, courts }
        })
        .collect();

    Ok(Json(AvailabilityResponse {
        date,
        cached,
        floor,
        columns: columns
            .iter()
            .map(|time| time.format("%H:%M").to_string())
            .collect(),
        venues,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    params(RefreshQuery),
    responses(
        (status = 200, body = RefreshResponse),
        (status = 400, description = "Invalid or out-of-range date"),
        (status = 429, description = "Action budget spent"),
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    client: ClientId,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Json<RefreshResponse>> {
    let date = state.window.parse_and_admit(query.date.as_deref())?;
    charge(&state, &client, false)?;

    let invalidated = state.registry.invalidate_date(date);
    info!(
        "Refresh of {} requested by {} ({} entries dropped)",
        date,
        client.as_str(),
        invalidated
    );
    let venues = state.registry.fetch_all(date).await;

    Ok(Json(RefreshResponse {
        date,
        invalidated,
        venues,
    }))
}

#[utoipa::path(get, path = "/api/v1/stats", responses((status = 200, body = StatsResponse)))]
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.registry.cache_stats(),
        cached_entries: state.registry.cached_entries(),
        in_flight: state.registry.in_flight_fetches(),
        tracked_clients: state.limiter.tracked_clients(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues))
        .route("/dates", get(list_dates))
        .route("/availability", get(get_availability))
        .route("/refresh", post(refresh))
        .route("/stats", get(stats))
}
