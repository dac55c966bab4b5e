//! Expiration scanner (C4): a single task that wakes once per second and
//! reclaims expired bindings and stale pending offers. Never shares a path
//! with the handler, so a slow handler cannot delay expiration (spec §4.4).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::store::Store;

const TICK: Duration = Duration::from_secs(1);

pub async fn run(store: Arc<Store>) {
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let reclaimed = store.reclaim_expired(Instant::now());
        for (ha, ip) in reclaimed {
            info!(%ha, %ip, "expire");
        }
    }
}
