// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack patterns for abuse simulation.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated seconds between consecutive requests
    pub interval_secs: f64,
    /// Number of distinct client IPs, used round-robin
    pub unique_clients: usize,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval_secs: 1.0,
            unique_clients: 1,
        }
    }
}

impl AttackConfig {
    /// One client posting as fast as it can.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 1000,
            interval_secs: 0.0,
            unique_clients: 1,
        }
    }

    /// Many clients, each flooding.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 2000,
            interval_secs: 0.0,
            unique_clients: 100,
        }
    }

    /// One client sustaining a post every ten minutes for a day.
    pub fn sustained_day() -> Self {
        Self {
            total_requests: 144,
            interval_secs: 600.0,
            unique_clients: 1,
        }
    }

    /// One client staying under the refill rate (one post per hour).
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 48,
            interval_secs: 3600.0,
            unique_clients: 1,
        }
    }

    /// Simulated seconds covered by the whole attack.
    pub fn span_secs(&self) -> f64 {
        self.total_requests.saturating_sub(1) as f64 * self.interval_secs
    }
}
