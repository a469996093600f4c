// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome collection for abuse simulation results.

use std::collections::HashMap;

/// Collects outcomes during a simulated attack.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Granted requests by client
    granted_per_client: HashMap<String, usize>,
    /// Simulated seconds covered by the attack
    span_secs: f64,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    InvalidInput,
    Error,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, client: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome == Outcome::Allowed {
            *self.granted_per_client.entry(client.to_string()).or_insert(0) += 1;
        }
    }

    pub fn set_span_secs(&mut self, secs: f64) {
        self.span_secs = secs;
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Most requests any single client got through.
    pub fn max_granted_per_client(&self) -> usize {
        self.granted_per_client.values().copied().max().unwrap_or(0)
    }

    /// Ratio of blocked to total requests.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(Outcome::Allowed)) as f64 / total as f64
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            invalid_input: self.count(Outcome::InvalidInput),
            errors: self.count(Outcome::Error),
            block_rate: self.block_rate(),
            clients_served: self.granted_per_client.len(),
            max_granted_per_client: self.max_granted_per_client(),
            span_secs: self.span_secs,
        }
    }
}

/// Summary of an attack simulation.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub invalid_input: usize,
    pub errors: usize,
    pub block_rate: f64,
    pub clients_served: usize,
    pub max_granted_per_client: usize,
    pub span_secs: f64,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Simulated span:    {:.0} s", self.span_secs)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Invalid Input:     {}", self.invalid_input)?;
        writeln!(f, "Errors:            {}", self.errors)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Clients Served:    {}", self.clients_served)?;
        writeln!(f, "Max per Client:    {}", self.max_granted_per_client)?;
        Ok(())
    }
}
