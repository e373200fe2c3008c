//! Sliding-window action budget per client.
//!
//! Each client gets a log of the instants at which it performed a costly
//! action (changing date, forcing a refresh). A new costly action is allowed
//! while fewer than `max_actions` instants fall inside the trailing window.
//!
//! Whether an action is costly is decided by the caller: requests that can be
//! answered entirely from cache are passed in as cache hits and never touch
//! the budget.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

/// Default trailing window: 5 minutes.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default number of costly actions per window.
const DEFAULT_MAX_ACTIONS: usize = 5;

/// Action log for a single client.
#[derive(Debug)]
struct ClientBudget {
    /// Instants of counted actions, oldest first.
    actions: VecDeque<Instant>,
    /// Last time the client was seen at all, hit or not.
    last_seen: Instant,
}

impl ClientBudget {
    fn new(now: Instant) -> Self {
        Self {
            actions: VecDeque::new(),
            last_seen: now,
        }
    }

    /// Drop actions that have left the window.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.actions.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.actions.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rate limiter configuration.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Length of the trailing window.
    pub window: Duration,
    /// Costly actions allowed inside one window.
    pub max_actions: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_actions: DEFAULT_MAX_ACTIONS,
        }
    }
}

/// Per-client sliding-window rate limiter.
///
/// Thread-safe. Client state is created on first contact and can be
/// garbage-collected with [`purge_idle`](Self::purge_idle).
pub struct ClientRateLimiter {
    /// Per-client action logs.
    clients: Mutex<HashMap<String, ClientBudget>>,
    config: RateLimitConfig,
}

impl ClientRateLimiter {
    /// Create a rate limiter with default settings (5 actions / 5 minutes).
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Lock the clients mutex, recovering from poison if necessary.
    ///
    /// A poisoned ledger can at worst be off by one action.
    fn lock_clients(&self) -> MutexGuard<'_, HashMap<String, ClientBudget>> {
        self.clients.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Decide whether `client` may proceed.
    ///
    /// Cache hits are always allowed and not recorded. Anything else is
    /// allowed while the client has budget left, and then recorded.
    pub fn allow(&self, client: &str, is_cache_hit: bool) -> bool {
        self.allow_at(client, is_cache_hit, Instant::now())
    }

    /// [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, client: &str, is_cache_hit: bool, now: Instant) -> bool {
        let mut clients = self.lock_clients();

        let budget = clients
            .entry(client.to_string())
            .or_insert_with(|| ClientBudget::new(now));
        budget.last_seen = now;
        budget.prune(now, self.config.window);

        if is_cache_hit {
            debug!("Rate limiter: cache hit for '{}', not counted", client);
            return true;
        }

        if budget.actions.len() < self.config.max_actions {
            budget.actions.push_back(now);
            debug!(
                "Rate limiter: allowed '{}' ({}/{})",
                client,
                budget.actions.len(),
                self.config.max_actions
            );
            true
        } else {
            debug!(
                "Rate limiter: denied '{}', {} actions in the last {:?}",
                client,
                budget.actions.len(),
                self.config.window
            );
            false
        }
    }

    /// Costly actions `client` can still take right now.
    pub fn remaining(&self, client: &str) -> usize {
        self.remaining_at(client, Instant::now())
    }

    pub fn remaining_at(&self, client: &str, now: Instant) -> usize {
        let mut clients = self.lock_clients();
        match clients.get_mut(client) {
            Some(budget) => {
                budget.prune(now, self.config.window);
                self.config.max_actions.saturating_sub(budget.actions.len())
            }
            None => self.config.max_actions,
        }
    }

    /// How long until `client` gets budget back, if it has none now.
    pub fn retry_after(&self, client: &str) -> Option<Duration> {
        self.retry_after_at(client, Instant::now())
    }

    pub fn retry_after_at(&self, client: &str, now: Instant) -> Option<Duration> {
        let mut clients = self.lock_clients();
        let budget = clients.get_mut(client)?;
        budget.prune(now, self.config.window);

        if budget.actions.len() < self.config.max_actions {
            return None;
        }

        // The slot frees up when the oldest counted action leaves the window.
        let oldest = *budget.actions.front()?;
        Some((oldest + self.config.window).saturating_duration_since(now))
    }

    /// Forget everything about `client`.
    pub fn reset(&self, client: &str) {
        self.lock_clients().remove(client);
    }

    /// Drop clients not seen for at least `idle_for`. Returns how many.
    pub fn purge_idle(&self, idle_for: Duration) -> usize {
        self.purge_idle_at(idle_for, Instant::now())
    }

    pub fn purge_idle_at(&self, idle_for: Duration, now: Instant) -> usize {
        let mut clients = self.lock_clients();
        let before = clients.len();
        clients.retain(|_, budget| now.saturating_duration_since(budget.last_seen) < idle_for);
        let purged = before - clients.len();
        if purged > 0 {
            debug!("Rate limiter: purged {} idle clients", purged);
        }
        purged
    }

    /// Number of clients with state in memory.
    pub fn tracked_clients(&self) -> usize {
        self.lock_clients().len()
    }
}

impl Default for ClientRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
