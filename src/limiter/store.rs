// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Concurrent bucket storage keyed by client identity.

use super::bucket::Bucket;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared map from client key to [`Bucket`].
///
/// Cloning is cheap and yields a handle to the same map, so one store can be
/// handed to both the request gate and the reclaimer. Reads share the lock;
/// writes and sweeps take it exclusively. Entries are replaced whole, so a
/// reader never sees a half-updated bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Bucket> {
        self.buckets.read().await.get(key).copied()
    }

    /// Insert or replace the state for `key`.
    pub async fn put(&self, key: &str, bucket: Bucket) {
        self.buckets.write().await.insert(key.to_string(), bucket);
    }

    /// Replace the whole map with the entries `keep` accepts, in one
    /// exclusive section. Returns the number of entries dropped.
    pub async fn snapshot_and_replace<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&str, &Bucket) -> bool,
    {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        let retained: HashMap<String, Bucket> = buckets
            .drain()
            .filter(|(key, bucket)| keep(key.as_str(), bucket))
            .collect();
        *buckets = retained;
        before - buckets.len()
    }

    /// Number of tracked clients.
    pub async fn len(&self) -> usize {
        self.buckets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buckets.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn keys(&self) -> Vec<String> {
        self.buckets.read().await.keys().cloned().collect()
    }
}
