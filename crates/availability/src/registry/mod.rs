//! Provider registry module.
//!
//! This module provides orchestration for availability providers, including:
//! - Provider registration and stable ordering
//! - Concurrent, cached, timeout-bounded fetching
//! - Per-client rate limiting of costly actions
//! - The servable date window

mod date_window;
mod rate_limiter;
mod registry;

pub use date_window::{DateWindow, DEFAULT_SPAN_DAYS, DEFAULT_TIMEZONE};
pub use rate_limiter::{ClientRateLimiter, RateLimitConfig};
pub use registry::{AvailabilityRegistry, RegistryConfig, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
