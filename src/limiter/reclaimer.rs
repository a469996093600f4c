// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Background eviction of idle buckets.

use super::store::BucketStore;
use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodically drops buckets that have been idle for longer than `expires`.
#[derive(Clone)]
pub struct Reclaimer {
    store: BucketStore,
    expires: Duration,
    interval: Duration,
    metrics: Option<Metrics>,
}

impl Reclaimer {
    pub fn new(store: BucketStore, expires: Duration, interval: Duration) -> Self {
        Self {
            store,
            expires,
            interval,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one sweep as of `now`. Returns the number of evicted buckets.
    ///
    /// Buckets with an unusable timestamp are kept.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expires = self.expires;
        let evicted = self
            .store
            .snapshot_and_replace(|_, bucket| {
                if !bucket.has_valid_timestamp() {
                    return true;
                }
                match (now - bucket.last_event).to_std() {
                    Ok(idle) => idle <= expires,
                    // Timestamp in the future.
                    Err(_) => true,
                }
            })
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.sweeps.inc();
            metrics.evictions.inc_by(evicted as u64);
            metrics.tracked_clients.set(self.store.len().await as i64);
        }
        evicted
    }

    /// Start sweeping every `interval` until the returned handle is shut down.
    pub fn spawn(self) -> ReclaimerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            info!(
                expires_secs = self.expires.as_secs(),
                interval_secs = self.interval.as_secs(),
                "Rate limit reclaimer started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.sweep(Utc::now()).await;
                        debug!(evicted, "Rate limit sweep finished");
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("Rate limit reclaimer stopped");
        });

        ReclaimerHandle { shutdown_tx, task }
    }
}

/// Owner of a running reclaimer task.
pub struct ReclaimerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::bucket::Bucket;
    use chrono::TimeDelta;

    const HOUR: Duration = Duration::from_secs(3600);

    fn reclaimer(store: &BucketStore) -> Reclaimer {
        Reclaimer::new(store.clone(), 25 * HOUR, Duration::from_secs(300))
    }

    async fn touch(store: &BucketStore, key: &str, at: DateTime<Utc>) {
        store.put(key, Bucket::full(5.0, at)).await;
    }

    #[tokio::test]
    async fn test_expired_bucket_is_evicted() {
        let store = BucketStore::new();
        let now = Utc::now();
        touch(&store, "stale", now - TimeDelta::hours(25) - TimeDelta::seconds(1)).await;
        touch(&store, "fresh", now - TimeDelta::minutes(5)).await;

        let evicted = reclaimer(&store).sweep(now).await;

        assert_eq!(evicted, 1);
        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_bucket_just_inside_expiry_survives() {
        let store = BucketStore::new();
        let now = Utc::now();
        touch(&store, "edge", now - TimeDelta::hours(25) + TimeDelta::milliseconds(1)).await;
        touch(&store, "exact", now - TimeDelta::hours(25)).await;

        assert_eq!(reclaimer(&store).sweep(now).await, 0);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = BucketStore::new();
        let now = Utc::now();
        for hours in [1, 10, 24, 26, 48] {
            touch(&store, &format!("client-{hours}"), now - TimeDelta::hours(hours)).await;
        }
        let reclaimer = reclaimer(&store);

        reclaimer.sweep(now).await;
        let mut first = store.keys().await;
        assert_eq!(reclaimer.sweep(now).await, 0);
        let mut second = store.keys().await;

        first.sort();
        second.sort();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_unusable_timestamp_is_kept() {
        let store = BucketStore::new();
        store
            .put(
                "corrupt",
                Bucket {
                    last_event: DateTime::<Utc>::MIN_UTC,
                    level: 1.0,
                },
            )
            .await;

        assert_eq!(reclaimer(&store).sweep(Utc::now()).await, 0);
        assert!(store.get("corrupt").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_updates_metrics() {
        let store = BucketStore::new();
        let now = Utc::now();
        touch(&store, "stale", now - TimeDelta::days(3)).await;
        touch(&store, "fresh", now).await;
        let metrics = Metrics::new().unwrap();

        reclaimer(&store)
            .with_metrics(metrics.clone())
            .sweep(now)
            .await;

        assert_eq!(metrics.sweeps.get(), 1);
        assert_eq!(metrics.evictions.get(), 1);
        assert_eq!(metrics.tracked_clients.get(), 1);
    }

    #[tokio::test]
    async fn test_spawned_task_sweeps_and_stops() {
        let store = BucketStore::new();
        touch(&store, "stale", Utc::now() - TimeDelta::days(2)).await;

        let handle = Reclaimer::new(store.clone(), HOUR, Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.is_empty().await);

        handle.shutdown().await;
        touch(&store, "stale-again", Utc::now() - TimeDelta::days(2)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.len().await, 1);
    }
}
