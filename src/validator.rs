// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form validation.
//!
//! - Client identity from the transport-level remote address
//! - Field sanitization (trim, strip markup and non-printable characters)
//! - Sender address check

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing port in address {0:?}")]
    MissingPort(String),

    #[error("too many colons in address {0:?}")]
    TooManyColons(String),

    #[error("missing host in address {0:?}")]
    MissingHost(String),

    #[error("invalid sender address {0:?}")]
    InvalidSender(String),
}

/// Raw form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Sanitized submission, ready to render and relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub from: lettre::Address,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Sanitize every field and check the sender address.
    pub fn validate(&self) -> Result<Submission, ValidationError> {
        let email = sanitize(&self.email);
        let from = email.parse::<lettre::Address>().map_err(|err| {
            debug!(email = %email, error = %err, "Invalid sender address");
            ValidationError::InvalidSender(email.clone())
        })?;

        Ok(Submission {
            name: sanitize(&self.name),
            from,
            subject: sanitize(&self.subject),
            message: sanitize(&self.message),
        })
    }
}

/// Client identity for rate limiting: the host part of a `host:port` address.
///
/// IPv6 hosts must be bracketed (`[::1]:8080`).
pub fn client_key(remote_addr: &str) -> Result<String, ValidationError> {
    let invalid = |make: fn(String) -> ValidationError| make(remote_addr.to_string());

    let (host, _port) = if let Some(bracketed) = remote_addr.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid(ValidationError::MissingPort))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| invalid(ValidationError::MissingPort))?;
        if port.contains(':') {
            return Err(invalid(ValidationError::TooManyColons));
        }
        (host, port)
    } else {
        let (host, port) = remote_addr
            .rsplit_once(':')
            .ok_or_else(|| invalid(ValidationError::MissingPort))?;
        if host.contains(':') {
            return Err(invalid(ValidationError::TooManyColons));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(invalid(ValidationError::MissingHost));
    }
    Ok(host.to_string())
}

/// Trim `input` and drop quotes, angle brackets, escaped double quotes, and
/// characters outside tab, newline, carriage return, printable ASCII and
/// U+00A1..=U+00FF.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'"') {
            chars.next();
            continue;
        }
        if matches!(c, '\'' | '<' | '>') {
            continue;
        }
        if matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{7E}' | '\u{A1}'..='\u{FF}') {
            out.push(c);
        }
    }
    out
}
