// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket state and the admission decision.
//!
//! The bucket refills continuously at `rate` tokens per second up to `burst`.
//! Each granted request consumes one token; a denied request consumes nothing
//! but still moves the bucket's clock forward, banking the refill so far.

use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use chrono::{DateTime, Utc};

/// Per-client rate state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Time of the most recent admission check.
    pub last_event: DateTime<Utc>,
    /// Available tokens, within `[0, burst]`.
    pub level: f64,
}

impl Bucket {
    /// A bucket with no history: full at `now`.
    pub fn full(burst: f64, now: DateTime<Utc>) -> Self {
        Self {
            last_event: now,
            level: burst,
        }
    }

    /// Whether the timestamp is representable at nanosecond precision.
    pub fn has_valid_timestamp(&self) -> bool {
        self.last_event.timestamp_nanos_opt().is_some()
    }

    /// Whether the level is a finite token count within `[0, burst]`.
    pub fn has_valid_level(&self, burst: f64) -> bool {
        self.level.is_finite() && (0.0..=burst).contains(&self.level)
    }

    /// Seconds elapsed between the last event and `now`, clamped at zero
    /// when the clock moved backwards.
    fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_event)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// State to store for the client after this check.
    pub bucket: Bucket,
    /// Whether the request may proceed.
    pub granted: bool,
}

/// Compute refill and the grant decision for one request.
///
/// Pure: the result depends only on the arguments. Corrupt stored state is
/// reported as an error rather than reset.
pub fn evaluate(
    key: &str,
    existing: Option<&Bucket>,
    now: DateTime<Utc>,
    config: &RateLimitConfig,
) -> Result<Admission, RateLimitError> {
    let burst = config.burst;

    let bucket = match existing {
        None => Bucket::full(burst, now),
        Some(bucket) => {
            if !bucket.has_valid_timestamp() {
                return Err(RateLimitError::MalformedTimestamp {
                    key: key.to_string(),
                    timestamp: bucket.last_event,
                });
            }
            if !bucket.has_valid_level(burst) {
                return Err(RateLimitError::MalformedLevel {
                    key: key.to_string(),
                    level: bucket.level,
                });
            }
            *bucket
        }
    };

    let refill = bucket.elapsed_secs(now) * config.rate;
    let mut level = (bucket.level + refill).min(burst);

    let granted = level >= 1.0;
    if granted {
        level -= 1.0;
    }

    Ok(Admission {
        bucket: Bucket {
            last_event: now,
            level: level.clamp(0.0, burst),
        },
        granted,
    })
}
