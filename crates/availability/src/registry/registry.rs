//! Aggregation registry for availability providers.
//!
//! The registry owns the registered providers and the cache in front of
//! them. For a date it fetches every provider concurrently, each one under
//! its own timeout, and turns every failure into a per-provider outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::cache::{CacheStats, TtlCache};
use crate::errors::AvailabilityError;
use crate::models::{CacheKey, CourtAvailability, ProviderOutcome};
use crate::provider::AvailabilityProvider;

/// Default lifetime of a cached result: 5 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default upper bound for a single provider fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Registry configuration.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How long a successful fetch is served from cache.
    pub cache_ttl: Duration,
    /// How long a single provider may take before it counts as failed.
    pub fetch_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Registry that fans availability requests out to every provider.
///
/// Build it, [`register`](Self::register) providers, then share it (usually
/// behind an `Arc`) with whatever serves requests. Registration needs
/// `&mut self`, so it cannot overlap with serving.
pub struct AvailabilityRegistry {
    providers: Vec<Arc<dyn AvailabilityProvider>>,
    cache: TtlCache<CacheKey, CourtAvailability>,
    config: RegistryConfig,
}

impl AvailabilityRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            providers: Vec::new(),
            cache: TtlCache::new(),
            config,
        }
    }

    /// Add a provider. Outcomes are reported in registration order.
    pub fn register(
        &mut self,
        provider: Arc<dyn AvailabilityProvider>,
    ) -> Result<(), AvailabilityError> {
        if self.providers.iter().any(|p| p.id() == provider.id()) {
            return Err(AvailabilityError::DuplicateProvider(provider.id().to_string()));
        }

        info!(
            "Registered provider '{}' ({})",
            provider.id(),
            provider.name()
        );
        self.providers.push(provider);
        Ok(())
    }

    pub fn providers(&self) -> &[Arc<dyn AvailabilityProvider>] {
        &self.providers
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn provider(&self, id: &str) -> Option<&Arc<dyn AvailabilityProvider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Fetch every registered provider for `date`.
    ///
    /// Providers run concurrently. The call returns once each has either
    /// answered, failed or timed out, with exactly one outcome per provider
    /// in registration order.
    pub async fn fetch_all(&self, date: NaiveDate) -> Vec<ProviderOutcome> {
        let started = Instant::now();

        let outcomes = join_all(
            self.providers
                .iter()
                .map(|provider| self.fetch_provider(provider, date)),
        )
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Fetched {} providers for {} in {:?} ({} failed)",
            outcomes.len(),
            date,
            started.elapsed(),
            failed
        );
        outcomes
    }

    /// Fetch a single provider for `date`.
    pub async fn fetch_one(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<ProviderOutcome, AvailabilityError> {
        let provider = self
            .provider(provider_id)
            .ok_or_else(|| AvailabilityError::UnknownProvider(provider_id.to_string()))?;
        Ok(self.fetch_provider(provider, date).await)
    }

    /// Fetch `days` consecutive dates starting at `start`, one date at a time.
    pub async fn fetch_range(
        &self,
        start: NaiveDate,
        days: u32,
    ) -> Vec<(NaiveDate, Vec<ProviderOutcome>)> {
        let mut results = Vec::with_capacity(days as usize);
        for date in start.iter_days().take(days as usize) {
            results.push((date, self.fetch_all(date).await));
        }
        results
    }

    /// Whether `date` can be served without any upstream call.
    ///
    /// True only if every registered provider has a fresh cache entry.
    pub fn is_cached(&self, date: NaiveDate) -> bool {
        self.providers
            .iter()
            .all(|p| self.cache.contains(&CacheKey::new(p.id().to_string(), date)))
    }

    pub fn is_provider_cached(&self, provider_id: &str, date: NaiveDate) -> bool {
        self.cache
            .contains(&CacheKey::new(provider_id.to_string(), date))
    }

    /// Cached availability, without fetching.
    pub fn cached(&self, provider_id: &str, date: NaiveDate) -> Option<CourtAvailability> {
        self.cache.get(&CacheKey::new(provider_id.to_string(), date))
    }

    /// Drop every cached result for `date`.
    ///
    /// Fetches still running for `date` are kept and later callers join them.
    pub fn invalidate_date(&self, date: NaiveDate) -> usize {
        let removed = self.cache.invalidate_where(|key| key.date == date);
        debug!("Invalidated {} cache entries for {}", removed, date);
        removed
    }

    /// Drop cached results for dates before `today`.
    pub fn invalidate_before(&self, today: NaiveDate) -> usize {
        self.cache.invalidate_where(|key| key.date < today)
    }

    pub fn clear_cache(&self) {
        info!("Clearing availability cache");
        self.cache.clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Fetches currently running upstream.
    pub fn in_flight_fetches(&self) -> usize {
        self.cache.in_flight()
    }

    async fn fetch_provider(
        &self,
        provider: &Arc<dyn AvailabilityProvider>,
        date: NaiveDate,
    ) -> ProviderOutcome {
        let key = CacheKey::new(provider.id().to_string(), date);
        let task_provider = Arc::clone(provider);
        let timeout = self.config.fetch_timeout;

        let result = self
            .cache
            .get_or_compute(
                key,
                move || fetch_with_timeout(task_provider, date, timeout),
                self.config.cache_ttl,
            )
            .await;

        match result {
            Ok(availability) => ProviderOutcome::Available(availability),
            Err(e) => {
                warn!("Provider '{}' failed for {}: {}", provider.id(), date, e);
                ProviderOutcome::failed(provider.id(), provider.name(), provider.url(), &e)
            }
        }
    }
}

impl Default for AvailabilityRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Run one provider fetch under `timeout`.
///
/// On timeout the provider's future is dropped, which cancels whatever I/O
/// it had in flight.
async fn fetch_with_timeout(
    provider: Arc<dyn AvailabilityProvider>,
    date: NaiveDate,
    timeout: Duration,
) -> Result<CourtAvailability, AvailabilityError> {
    let started = Instant::now();

    match tokio::time::timeout(timeout, provider.fetch(date)).await {
        Ok(Ok(availability)) => {
            debug!(
                "Provider '{}' returned {} slots for {} in {:?}",
                provider.id(),
                availability.available_count(),
                date,
                started.elapsed()
            );
            Ok(availability)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AvailabilityError::Timeout {
            provider: provider.id().to_string(),
            after: timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::models::TimeSlot;
    use async_trait::async_trait;
    use chrono::{Days, NaiveTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
        Panic,
    }

    struct MockProvider {
        id: &'static str,
        delay: Duration,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, delay: Duration, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                delay,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AvailabilityProvider for MockProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn url(&self) -> &str {
            "https://example.test"
        }

        async fn fetch(&self, date: NaiveDate) -> Result<CourtAvailability, AvailabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            match self.behavior {
                Behavior::Succeed => Ok(CourtAvailability::new(self.id, self.id, self.url(), date)
                    .with_slots(vec![TimeSlot::new(
                        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                    )
                    .with_court("Court 1")])),
                Behavior::Fail => Err(AvailabilityError::provider(self.id, "HTTP 500")),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Behavior::Panic => panic!("unexpected markup"),
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 4).unwrap()
    }

    fn registry_with(providers: &[Arc<MockProvider>]) -> AvailabilityRegistry {
        let mut registry = AvailabilityRegistry::new(RegistryConfig {
            cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(2),
        });
        for provider in providers {
            registry.register(provider.clone()).unwrap();
        }
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_follow_registration_order() {
        let slow = MockProvider::new("slow", Duration::from_millis(900), Behavior::Succeed);
        let fast = MockProvider::new("fast", Duration::from_millis(10), Behavior::Succeed);
        let mid = MockProvider::new("mid", Duration::from_millis(300), Behavior::Succeed);
        let registry = registry_with(&[slow, fast, mid]);

        let outcomes = registry.fetch_all(date()).await;
        let order: Vec<_> = outcomes.iter().map(|o| o.provider()).collect();
        assert_eq!(order, vec!["slow", "fast", "mid"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated() {
        let a = MockProvider::new("a", Duration::from_millis(50), Behavior::Fail);
        let b = MockProvider::new("b", Duration::from_millis(100), Behavior::Succeed);
        let c = MockProvider::new("c", Duration::from_millis(150), Behavior::Succeed);
        let registry = registry_with(&[a, b, c]);

        let started = Instant::now();
        let outcomes = registry.fetch_all(date()).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].failure().map(|f| f.kind),
            Some(FailureKind::Upstream)
        );
        assert!(outcomes[1].is_success());
        assert!(outcomes[2].is_success());
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out_without_blocking_others() {
        let a = MockProvider::new("a", Duration::from_millis(200), Behavior::Succeed);
        let b = MockProvider::new("b", Duration::ZERO, Behavior::Hang);
        let registry = registry_with(&[a, b]);

        let started = Instant::now();
        let outcomes = registry.fetch_all(date()).await;
        let elapsed = started.elapsed();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        let failure = outcomes[1].failure().expect("b should fail");
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.provider, "b");
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_provider_becomes_internal_failure() {
        let a = MockProvider::new("a", Duration::ZERO, Behavior::Panic);
        let b = MockProvider::new("b", Duration::ZERO, Behavior::Succeed);
        let registry = registry_with(&[a, b]);

        let outcomes = registry.fetch_all(date()).await;
        assert_eq!(
            outcomes[0].failure().map(|f| f.kind),
            Some(FailureKind::Internal)
        );
        assert!(outcomes[1].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_cached_failure_retried() {
        let ok = MockProvider::new("ok", Duration::ZERO, Behavior::Succeed);
        let bad = MockProvider::new("bad", Duration::ZERO, Behavior::Fail);
        let registry = registry_with(&[ok.clone(), bad.clone()]);

        let first = registry.fetch_all(date()).await;
        let second = registry.fetch_all(date()).await;

        assert_eq!(ok.calls(), 1);
        assert_eq!(bad.calls(), 2);
        assert_eq!(first[0], second[0]);
        assert!(registry.is_provider_cached("ok", date()));
        assert!(!registry.is_provider_cached("bad", date()));
        assert!(!registry.is_cached(date()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_triggers_refetch() {
        let ok = MockProvider::new("ok", Duration::ZERO, Behavior::Succeed);
        let registry = registry_with(&[ok.clone()]);

        registry.fetch_all(date()).await;
        assert!(registry.is_cached(date()));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!registry.is_cached(date()));

        registry.fetch_all(date()).await;
        assert_eq!(ok.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_date_forces_refetch() {
        let ok = MockProvider::new("ok", Duration::ZERO, Behavior::Succeed);
        let registry = registry_with(&[ok.clone()]);
        let other_day = date().succ_opt().unwrap();

        registry.fetch_all(date()).await;
        registry.fetch_all(other_day).await;
        assert_eq!(registry.invalidate_date(date()), 1);
        assert!(registry.is_cached(other_day));

        registry.fetch_all(date()).await;
        assert_eq!(ok.calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_one() {
        let ok = MockProvider::new("ok", Duration::ZERO, Behavior::Succeed);
        let registry = registry_with(&[ok]);

        let outcome = registry.fetch_one("ok", date()).await.unwrap();
        assert!(outcome.is_success());
        assert!(registry.cached("ok", date()).is_some());

        assert_eq!(
            registry.fetch_one("missing", date()).await,
            Err(AvailabilityError::UnknownProvider("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_range_covers_each_day() {
        let ok = MockProvider::new("ok", Duration::ZERO, Behavior::Succeed);
        let registry = registry_with(&[ok.clone()]);

        let results = registry.fetch_range(date(), 3).await;
        let dates: Vec<_> = results.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates.len(), 3);
        assert_eq!(dates.last().copied(), date().checked_add_days(Days::new(2)));
        assert_eq!(ok.calls(), 3);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = AvailabilityRegistry::default();
        registry
            .register(MockProvider::new("a", Duration::ZERO, Behavior::Succeed))
            .unwrap();
        let err = registry
            .register(MockProvider::new("a", Duration::ZERO, Behavior::Fail))
            .unwrap_err();

        assert_eq!(err, AvailabilityError::DuplicateProvider("a".to_string()));
        assert_eq!(registry.provider_ids(), vec!["a"]);
    }
}
