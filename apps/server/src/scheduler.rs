//! Background housekeeping for the cache and the rate limiter.
//!
//! Both structures already ignore stale state on read. This task only
//! reclaims the memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::main_lib::AppState;

/// Starts the periodic housekeeping task.
pub fn start_housekeeping(
    state: Arc<AppState>,
    every: Duration,
    client_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Housekeeping started ({:?} interval, clients idle after {:?})",
            every, client_idle
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick is immediate and there is nothing to clean yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_housekeeping(&state, client_idle);
        }
    })
}

/// Runs a single housekeeping pass.
pub fn run_housekeeping(state: &AppState, client_idle: Duration) {
    let expired = state.registry.purge_expired();
    let past = state.registry.invalidate_before(state.window.today());
    let idle = state.limiter.purge_idle(client_idle);

    if expired + past + idle > 0 {
        debug!(
            "Housekeeping: {} expired entries, {} past-date entries, {} idle clients removed",
            expired, past, idle
        );
    }
}
