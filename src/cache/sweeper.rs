use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::store::Store;

/// Periodically purges expired entries until cancelled or until the store
/// is gone
pub(super) async fn sweep<K, V>(
    store: Weak<Mutex<Store<K, V>>>,
    interval: Duration,
    token: CancellationToken,
) where
    K: Clone + Eq + Hash,
    V: Clone,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.lock().purge_expired(Instant::now());
                if removed > 0 {
                    log::debug!("Cache sweep removed {removed} expired entries");
                }
            }
        }
    }

    log::debug!("Cache sweeper stopped");
}
