//! In-memory availability cache.
//!
//! Process-local and ephemeral. See [`TtlCache`] for the population rules.

mod ttl_cache;

pub use ttl_cache::{CacheStats, TtlCache};
