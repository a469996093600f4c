// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Receives contact form posts and relays them by e-mail, rate limited per
//! client IP.
//!
//! ## Configuration
//!
//! An optional YAML file (`--config`) provides every setting. Flags and
//! environment variables override the file:
//!
//! - `CONTACTME_CONFIG`: configuration file
//! - `CONTACTME_PORT`: port to listen on (default: 80)
//! - `CONTACTME_MAILSERVER`: SMTP server with port (e.g. smtp.gmail.com:587)
//! - `CONTACTME_USERNAME`: SMTP username (default: the mailbox)
//! - `CONTACTME_PASSWORD`: SMTP password
//! - `CONTACTME_MAILBOX`: address receiving all messages

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contactme::{
    config::{Config, ConfigOverrides},
    handlers::{router, AppState},
    limiter::{BucketStore, RateLimiter},
    mailer::SmtpRelay,
    metrics::Metrics,
};

#[derive(Parser)]
#[command(name = "contactme", version, about = "E-mail service with HTTP interface")]
struct Args {
    /// Configuration file (other parameters have priority)
    #[arg(short, long, env = "CONTACTME_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (default: 80)
    #[arg(long, env = "CONTACTME_PORT")]
    port: Option<String>,

    /// E-mail server address with port (e.g. smtp.gmail.com:587)
    #[arg(short = 's', long, env = "CONTACTME_MAILSERVER")]
    mailserver: Option<String>,

    /// E-mail server authentication username (default: same as mailbox)
    #[arg(short, long, env = "CONTACTME_USERNAME")]
    username: Option<String>,

    /// E-mail server authentication password
    #[arg(short, long, env = "CONTACTME_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// E-mail address that will receive all the e-mails
    #[arg(short, long, env = "CONTACTME_MAILBOX")]
    mailbox: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_file: args.config,
            port: args.port,
            mailserver: args.mailserver,
            username: args.username,
            password: args.password,
            mailbox: args.mailbox,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let overrides = ConfigOverrides::from(Args::parse());
    let config = match Config::load(&overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    };

    init_tracing(config.log.as_deref());

    info!(
        bind_addr = %config.bind_addr,
        mailserver = %config.mailserver.address,
        burst = config.rate_limit.burst,
        rate = config.rate_limit.rate,
        expires_secs = config.rate_limit.expires_secs,
        cleanup_secs = config.rate_limit.cleanup_secs,
        "Starting contact relay"
    );

    let metrics = Metrics::new().context("registering metrics")?;
    let limiter = RateLimiter::new(config.rate_limit.clone(), BucketStore::new())
        .with_metrics(metrics.clone());
    let transport = SmtpRelay::new(&config.mailserver).context("configuring mail transport")?;

    let reclaimer = limiter.reclaimer().spawn();

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(
        config,
        limiter,
        Arc::new(transport),
        metrics,
    )?);

    let app = router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    reclaimer.shutdown().await;
    info!("Contact relay stopped");
    Ok(())
}

/// JSON logs to `log_file` when it can be opened, standard output otherwise.
fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!(
                    "error opening log file {}, using standard output instead: {err}",
                    path.display()
                );
                None
            }
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match file {
        Some(file) => registry
            .with(fmt::layer().json().with_writer(Mutex::new(file)))
            .init(),
        None => registry.with(fmt::layer().json()).init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
