// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact relay.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the rate limiter when stored bucket state is corrupt.
///
/// These are never resolved by resetting the bucket: a client that could
/// corrupt its own record would otherwise clear its own penalty.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateLimitError {
    #[error("malformed bucket timestamp {timestamp} for client {key}")]
    MalformedTimestamp { key: String, timestamp: DateTime<Utc> },

    #[error("malformed bucket level {level} for client {key}")]
    MalformedLevel { key: String, level: f64 },
}

/// Errors in the e-mail body template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated action starting at byte {0}")]
    Unterminated(usize),

    #[error("unknown template field {0:?}, expected .ClientName or .Message")]
    UnknownField(String),
}

/// Errors while composing or relaying a message.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("invalid mail server address {0:?}, expected host:port")]
    InvalidServer(String),

    #[error("envelope error: {0}")]
    Envelope(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Startup configuration errors. Each maps to a distinct process exit code.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error opening configuration file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading configuration file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("invalid mailbox {0:?}")]
    InvalidMailbox(String),

    #[error("missing \"mailserver\" and/or \"mailbox\" arguments")]
    MissingParameters,

    #[error("error reading e-mail template: {0}")]
    Template(#[from] TemplateError),
}

impl ConfigError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::OpenFile { .. } => 1,
            Self::ReadFile { .. } => 2,
            Self::InvalidPort(_) => 3,
            Self::InvalidMailbox(_) => 4,
            Self::MissingParameters => 5,
            Self::Template(_) => 6,
        }
    }
}

/// Failures of a single contact request, mapped onto HTTP status codes.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid remote address {0:?}")]
    RemoteAddr(String),

    #[error("rate limit exceeded for {0}")]
    RateLimited(String),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RemoteAddr(_) | Self::RateLimit(_) | Self::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs; the client only sees the status.
        self.status().into_response()
    }
}
