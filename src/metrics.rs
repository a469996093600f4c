// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the relay.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Counters and gauges exported at the metrics endpoint.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Admission checks by result: granted, denied, error.
    pub admissions: IntCounterVec,
    /// Buckets held after the most recent sweep.
    pub tracked_clients: IntGauge,
    pub sweeps: IntCounter,
    pub evictions: IntCounter,
    pub mails_sent: IntCounter,
    pub mail_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("contactme".to_string()), None)?;

        let admissions = IntCounterVec::new(
            Opts::new("ratelimit_admissions_total", "Rate limit checks by result"),
            &["result"],
        )?;
        let tracked_clients = IntGauge::new(
            "ratelimit_tracked_clients",
            "Buckets retained by the last reclaimer sweep",
        )?;
        let sweeps = IntCounter::new("ratelimit_sweeps_total", "Reclaimer sweeps run")?;
        let evictions = IntCounter::new(
            "ratelimit_evictions_total",
            "Expired buckets dropped by the reclaimer",
        )?;
        let mails_sent = IntCounter::new("mails_sent_total", "Messages relayed upstream")?;
        let mail_failures =
            IntCounter::new("mail_failures_total", "Messages the upstream transport refused")?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(tracked_clients.clone()))?;
        registry.register(Box::new(sweeps.clone()))?;
        registry.register(Box::new(evictions.clone()))?;
        registry.register(Box::new(mails_sent.clone()))?;
        registry.register(Box::new(mail_failures.clone()))?;

        Ok(Self {
            registry,
            admissions,
            tracked_clients,
            sweeps,
            evictions,
            mails_sent,
            mail_failures,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_namespace() {
        let metrics = Metrics::new().unwrap();
        metrics.admissions.with_label_values(&["granted"]).inc();
        metrics.sweeps.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("contactme_ratelimit_admissions_total{result=\"granted\"} 1"));
        assert!(text.contains("contactme_ratelimit_sweeps_total 1"));
    }
}
