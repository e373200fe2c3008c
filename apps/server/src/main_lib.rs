use std::sync::Arc;

use padeltime_availability::{
    AvailabilityProvider, AvailabilityRegistry, ClientRateLimiter, DateWindow,
};
use padeltime_venues::default_venues;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub registry: Arc<AvailabilityRegistry>,
    pub limiter: Arc<ClientRateLimiter>,
    pub window: DateWindow,
}

pub fn init_tracing() {
    let log_format = std::env::var("PT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// State backed by the venue catalog.
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    build_state_with_providers(config, default_venues(&config.venue_credentials))
}

/// State backed by an explicit provider list, in display order.
pub fn build_state_with_providers(
    config: &Config,
    providers: Vec<Arc<dyn AvailabilityProvider>>,
) -> anyhow::Result<Arc<AppState>> {
    let mut registry = AvailabilityRegistry::new(config.registry_config());
    for provider in providers {
        registry.register(provider)?;
    }
    tracing::info!(
        "Serving {} venues, cache TTL {:?}, fetch timeout {:?}",
        registry.providers().len(),
        config.cache_ttl,
        config.fetch_timeout
    );

    Ok(Arc::new(AppState {
        registry: Arc::new(registry),
        limiter: Arc::new(ClientRateLimiter::with_config(config.rate_limit_config())),
        window: config.date_window(),
    }))
}
