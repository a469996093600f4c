// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Message composition and upstream delivery.

use crate::config::{Config, MailServerConfig};
use crate::error::MailError;
use async_trait::async_trait;
use base64::Engine;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Longest line written into a composed message, excluding CRLF.
const LINE_WIDTH: usize = 76;

/// UTF-8 bytes per RFC 2047 encoded word; 45 bytes encode to 60 base64
/// characters, keeping each word under 75 characters.
const ENCODED_WORD_BYTES: usize = 45;

/// A fully formatted message and its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: Address,
    pub to: Address,
    /// Headers, blank line and base64 body, CRLF separated.
    pub raw: String,
}

impl OutgoingMail {
    /// Format a plain-text UTF-8 message with a base64 body.
    ///
    /// Header values never contain line breaks. The body is wrapped at
    /// [`LINE_WIDTH`] columns.
    pub fn compose(from: Address, to: Address, subject: &str, body: &str) -> Self {
        let headers = [
            ("From", from.to_string()),
            ("To", to.to_string()),
            ("Subject", header_value(subject)),
            ("MIME-Version", "1.0".to_string()),
            ("Content-Type", "text/plain; charset=\"utf-8\"".to_string()),
            ("Content-Transfer-Encoding", "base64".to_string()),
        ];

        let mut raw = String::new();
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        raw.push_str("\r\n");

        let encoded = base64::engine::general_purpose::STANDARD.encode(body);
        let lines: Vec<&str> = encoded
            .as_bytes()
            .chunks(LINE_WIDTH)
            .filter_map(|line| std::str::from_utf8(line).ok())
            .collect();
        raw.push_str(&lines.join("\r\n"));

        Self { from, to, raw }
    }
}

/// Header text with control characters replaced by spaces. Non-ASCII or
/// long values become RFC 2047 encoded words on folded lines.
fn header_value(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.is_ascii() && flat.len() <= LINE_WIDTH {
        return flat;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in flat.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!(
        "=?utf-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text)
    )
}

/// Upstream delivery of composed messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// SMTP delivery with opportunistic STARTTLS.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    /// Build a relay for `host:port`. Credentials are sent only when both
    /// username and password are set.
    pub fn new(server: &MailServerConfig) -> Result<Self, MailError> {
        let (host, port) = server
            .address
            .rsplit_once(':')
            .and_then(|(host, port)| Some((host, port.parse::<u16>().ok()?)))
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| MailError::InvalidServer(server.address.clone()))?;

        let tls = TlsParameters::new(host.to_string())?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(Tls::Opportunistic(tls));

        if !server.username.is_empty() && !server.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                server.username.clone(),
                server.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let envelope = Envelope::new(Some(mail.from.clone()), vec![mail.to.clone()])?;
        let response = self.transport.send_raw(&envelope, mail.raw.as_bytes()).await?;
        debug!(code = %response.code(), "Upstream accepted message");
        Ok(())
    }
}

/// In-memory transport that keeps every message it is given.
///
/// A panic while the record is locked does not lose messages; later calls
/// keep using the recovered list.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail.clone());
        Ok(())
    }
}

/// Recipient address from the validated configuration.
pub fn mailbox(config: &Config) -> Result<Address, MailError> {
    config
        .mailbox
        .parse()
        .map_err(|source| MailError::InvalidAddress {
            address: config.mailbox.clone(),
            source,
        })
}
