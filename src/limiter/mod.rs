// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client token bucket rate limiting.
//!
//! - [`BucketStore`]: shared map of client key to bucket state
//! - [`bucket::evaluate`]: refill and grant decision
//! - [`Reclaimer`]: background eviction of idle buckets
//! - [`RateLimiter`]: the per-request gate tying them together

pub mod bucket;
pub mod reclaimer;
pub mod store;

pub use bucket::{Admission, Bucket};
pub use reclaimer::{Reclaimer, ReclaimerHandle};
pub use store::BucketStore;

use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use tracing::{debug, error};

/// Admission gate consulted once per inbound request.
///
/// The read and the write-back are separate store operations, so concurrent
/// checks for the same key can interleave and admit slightly more than the
/// burst. Checks for distinct keys are independent.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: BucketStore,
    metrics: Option<Metrics>,
}

impl RateLimiter {
    /// Create a gate over `store`.
    pub fn new(config: RateLimitConfig, store: BucketStore) -> Self {
        Self {
            config,
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// A reclaimer sharing this gate's store, configured from the same settings.
    pub fn reclaimer(&self) -> Reclaimer {
        let reclaimer = Reclaimer::new(
            self.store.clone(),
            self.config.expires(),
            self.config.cleanup_interval(),
        );
        match &self.metrics {
            Some(metrics) => reclaimer.with_metrics(metrics.clone()),
            None => reclaimer,
        }
    }

    /// Decide whether `key` may proceed at `now` and record the new state.
    pub async fn check_and_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RateLimitError> {
        let existing = self.store.get(key).await;

        let admission = match bucket::evaluate(key, existing.as_ref(), now, &self.config) {
            Ok(admission) => admission,
            Err(err) => {
                error!(client = %key, error = %err, "Corrupt rate limit state");
                self.record("error");
                return Err(err);
            }
        };

        self.store.put(key, admission.bucket).await;

        debug!(
            client = %key,
            granted = admission.granted,
            level = admission.bucket.level,
            "Rate limit check"
        );
        self.record(if admission.granted { "granted" } else { "denied" });
        Ok(admission.granted)
    }

    /// [`check_and_record`](Self::check_and_record) at the current time.
    pub async fn check(&self, key: &str) -> Result<bool, RateLimitError> {
        self.check_and_record(key, Utc::now()).await
    }

    fn record(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.admissions.with_label_values(&[result]).inc();
        }
    }
}
