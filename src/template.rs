// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Message body templates.
//!
//! A template is literal text with two substitution points, `{{.ClientName}}`
//! and `{{.Message}}`. Whitespace inside the braces is ignored.

use crate::error::TemplateError;

/// Body used when no template is configured.
pub const DEFAULT_TEMPLATE: &str = "Client: {{.ClientName}}
-------------------------------------
{{.Message}}
-------------------------------------

E-mail sent via ContactMe.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    ClientName,
    Message,
}

/// A parsed body template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    segments: Vec<Segment>,
}

impl EmailTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + start))?;

            segments.push(match after_open[..end].trim() {
                ".ClientName" => Segment::ClientName,
                ".Message" => Segment::Message,
                other => return Err(TemplateError::UnknownField(other.to_string())),
            });

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render the body for one submission.
    pub fn render(&self, client_name: &str, message: &str) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::ClientName => client_name,
                Segment::Message => message,
            })
            .collect()
    }
}
