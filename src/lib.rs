// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Accepts contact form submissions over HTTP and relays them by e-mail to a
//! single mailbox. The upstream mail server is shielded by a per-client
//! token bucket rate limiter:
//!
//! - Per-IP token buckets (burst 5, one token per ~47.6 minutes by default)
//! - Idle buckets evicted by a background reclaimer (25h by default)
//! - Corrupt bucket state fails closed
//! - Field sanitization and body templating before relay

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod template;
pub mod validator;

pub use config::Config;
pub use error::{RateLimitError, RelayError};
pub use limiter::{BucketStore, RateLimiter, Reclaimer};
pub use mailer::{MailTransport, SmtpRelay};
