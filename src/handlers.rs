// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! A submission passes the per-client rate limit before its form is even
//! decoded, so a flooding client costs one bucket update per request and
//! never reaches the upstream mail server.

use crate::config::Config;
use crate::error::{ConfigError, RelayError};
use crate::limiter::RateLimiter;
use crate::mailer::{self, MailTransport, OutgoingMail};
use crate::metrics::Metrics;
use crate::template::EmailTemplate;
use crate::validator::{client_key, ContactForm};
use axum::{
    extract::{rejection::FormRejection, ConnectInfo, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use lettre::Address;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub template: EmailTemplate,
    pub transport: Arc<dyn MailTransport>,
    pub mailbox: Address,
    pub subject_prefix: String,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        limiter: RateLimiter,
        transport: Arc<dyn MailTransport>,
        metrics: Metrics,
    ) -> Result<Self, ConfigError> {
        let template = EmailTemplate::parse(&config.email.template)?;
        let mailbox = mailer::mailbox(&config)
            .map_err(|_| ConfigError::InvalidMailbox(config.mailbox.clone()))?;
        Ok(Self {
            limiter,
            template,
            transport,
            mailbox,
            subject_prefix: config.email.subject_prefix.clone(),
            metrics,
            config,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", post(contact))
        .route("/health", get(health))
        .route("/healthz", get(health));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    if state.config.cors.enabled {
        router = router.layer(cors_layer(&state.config.cors.allow_origin));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(allow_origin: &str) -> CorsLayer {
    let origin = match allow_origin {
        "*" => AllowOrigin::any(),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(origin = %origin, "Invalid CORS origin, allowing any");
                AllowOrigin::any()
            }
        },
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contactme",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accept a contact form submission and relay it to the mailbox.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    form: Result<Form<ContactForm>, FormRejection>,
) -> Result<StatusCode, RelayError> {
    let remote = addr.to_string();
    let client = client_key(&remote).map_err(|err| {
        error!(remote = %remote, error = %err, "Invalid remote address");
        RelayError::RemoteAddr(remote.clone())
    })?;

    if !state.limiter.check(&client).await? {
        info!(client = %client, "Request rate limited");
        return Err(RelayError::RateLimited(client));
    }

    let Form(form) = form.map_err(|err| {
        warn!(client = %client, error = %err, "Undecodable form");
        RelayError::InvalidInput(err.body_text())
    })?;

    let submission = form.validate().map_err(|err| {
        warn!(client = %client, error = %err, "Invalid input");
        RelayError::InvalidInput(err.to_string())
    })?;

    let body = state.template.render(&submission.name, &submission.message);
    let mail = OutgoingMail::compose(
        submission.from,
        state.mailbox.clone(),
        &format!("{}{}", state.subject_prefix, submission.subject),
        &body,
    );

    if let Err(err) = state.transport.send(&mail).await {
        state.metrics.mail_failures.inc();
        error!(client = %client, error = %err, "Error sending e-mail");
        return Err(RelayError::from(err));
    }

    state.metrics.mails_sent.inc();
    debug!(client = %client, "Message relayed");
    Ok(StatusCode::OK)
}
