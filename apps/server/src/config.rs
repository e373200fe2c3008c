use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, ensure, Context};
use chrono_tz::Tz;
use padeltime_availability::registry::{
    DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, DEFAULT_SPAN_DAYS, DEFAULT_TIMEZONE,
};
use padeltime_availability::{DateWindow, RateLimitConfig, RegistryConfig};
use padeltime_venues::catalog::{login_env_var, venue_ids};
use padeltime_venues::{LoginCredentials, VenueCredentials};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_actions: usize,
    pub timezone: Tz,
    pub date_span_days: u32,
    pub housekeeping_interval: Duration,
    pub client_idle: Duration,
    pub venue_credentials: VenueCredentials,
}

impl Default for Config {
    fn default() -> Self {
        let rate_limit = RateLimitConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            rate_limit_window: rate_limit.window,
            rate_limit_max_actions: rate_limit.max_actions,
            timezone: DEFAULT_TIMEZONE,
            date_span_days: DEFAULT_SPAN_DAYS,
            housekeeping_interval: Duration::from_secs(60),
            client_idle: Duration::from_secs(60 * 60),
            venue_credentials: VenueCredentials::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = std::env::var("PT_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid PT_LISTEN_ADDR")?;
        let cors_allow = std::env::var("PT_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timezone = match std::env::var("PT_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow!("Invalid PT_TIMEZONE '{}': {}", name, e))?,
            Err(_) => defaults.timezone,
        };

        let config = Self {
            listen_addr,
            cors_allow,
            request_timeout: millis("PT_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            cache_ttl: secs("PT_CACHE_TTL_SECS", defaults.cache_ttl)?,
            fetch_timeout: millis("PT_FETCH_TIMEOUT_MS", defaults.fetch_timeout)?,
            rate_limit_window: secs("PT_RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window)?,
            rate_limit_max_actions: parsed(
                "PT_RATE_LIMIT_MAX_ACTIONS",
                defaults.rate_limit_max_actions,
            )?,
            timezone,
            date_span_days: parsed("PT_DATE_SPAN_DAYS", defaults.date_span_days)?,
            housekeeping_interval: secs(
                "PT_HOUSEKEEPING_INTERVAL_SECS",
                defaults.housekeeping_interval,
            )?,
            client_idle: secs("PT_CLIENT_IDLE_SECS", defaults.client_idle)?,
            venue_credentials: venue_credentials_from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break the server at runtime.
    ///
    /// The request timeout must outlast the per-venue fetch timeout, otherwise
    /// the whole response times out before slow venues can be reported
    /// individually.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.request_timeout > self.fetch_timeout,
            "PT_REQUEST_TIMEOUT_MS ({:?}) must be greater than PT_FETCH_TIMEOUT_MS ({:?})",
            self.request_timeout,
            self.fetch_timeout
        );
        ensure!(
            !self.fetch_timeout.is_zero(),
            "PT_FETCH_TIMEOUT_MS must be greater than zero"
        );
        ensure!(
            !self.housekeeping_interval.is_zero(),
            "PT_HOUSEKEEPING_INTERVAL_SECS must be greater than zero"
        );
        ensure!(
            !self.rate_limit_window.is_zero(),
            "PT_RATE_LIMIT_WINDOW_SECS must be greater than zero"
        );
        ensure!(
            self.rate_limit_max_actions >= 1,
            "PT_RATE_LIMIT_MAX_ACTIONS must be at least 1"
        );
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            cache_ttl: self.cache_ttl,
            fetch_timeout: self.fetch_timeout,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: self.rate_limit_window,
            max_actions: self.rate_limit_max_actions,
        }
    }

    pub fn date_window(&self) -> DateWindow {
        DateWindow::new(self.timezone, self.date_span_days)
    }
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn secs(key: &str, default: Duration) -> anyhow::Result<Duration> {
    parsed(key, default.as_secs()).map(Duration::from_secs)
}

fn millis(key: &str, default: Duration) -> anyhow::Result<Duration> {
    parsed(key, default.as_millis() as u64).map(Duration::from_millis)
}

/// Read `PT_VENUE_LOGIN_<ID>=login:password` for every catalog venue.
fn venue_credentials_from_env() -> anyhow::Result<VenueCredentials> {
    let mut credentials = VenueCredentials::new();
    for id in venue_ids() {
        let key = login_env_var(&id);
        let Ok(raw) = std::env::var(&key) else {
            continue;
        };
        let login = LoginCredentials::parse(&raw)
            .ok_or_else(|| anyhow!("Invalid {}: expected login:password", key))?;
        credentials.insert(id, login);
    }
    Ok(credentials)
}
