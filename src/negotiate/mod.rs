//! Content negotiation for the generic error path.
//!
//! Typed and status-aware rules render their own body shape; negotiation
//! only decides how the catch-all tier and the generic error page serialize
//! the payload. JSON is the default, XML is opt-in via the request's accept
//! signal, and anything unrecognized falls back to JSON without error.

use crate::common::response::ApiResult;
use serde_json::Value;
use strum_macros::{Display, EnumString};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Representation {
    #[default]
    #[strum(serialize = "json")]
    Json,
    #[strum(serialize = "xml")]
    Xml,
}

impl Representation {
    /// Pick a representation from the request's accept signal.
    ///
    /// Accepts either a bare token (`"xml"`) or an `Accept`-style header
    /// value (`"application/xml"`). Absent or unrecognized signals negotiate
    /// to JSON.
    pub fn negotiate(signal: Option<&str>) -> Self {
        let Some(signal) = signal else {
            return Self::Json;
        };
        if let Ok(representation) = signal.trim().parse::<Self>() {
            return representation;
        }
        if signal.to_ascii_lowercase().contains("xml") {
            Self::Xml
        } else {
            Self::Json
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Serialize a payload in this representation.
    pub fn render(self, result: &ApiResult) -> String {
        match self {
            Self::Json => serde_json::to_string(result).unwrap_or_else(|error| {
                // ApiResult has no fallible fields, so this path should be
                // unreachable; keep the response well-formed if it isn't.
                warn!(%error, "failed to serialize error payload");
                format!(r#"{{"code":{},"message":null,"data":null}}"#, result.code)
            }),
            Self::Xml => render_xml(result),
        }
    }
}

/// Write the three-field XML document: same field names as the JSON
/// rendering, element text escaped. `message` stays present (empty element)
/// when absent; `data` is emitted only when set.
fn render_xml(result: &ApiResult) -> String {
    let mut out = String::with_capacity(64);
    out.push_str("<result>");
    out.push_str("<code>");
    out.push_str(&result.code.to_string());
    out.push_str("</code>");
    match &result.message {
        Some(message) => {
            out.push_str("<message>");
            out.push_str(&escape_xml(message));
            out.push_str("</message>");
        }
        None => out.push_str("<message/>"),
    }
    if let Some(data) = &result.data {
        out.push_str("<data>");
        match data {
            Value::String(text) => out.push_str(&escape_xml(text)),
            other => out.push_str(&escape_xml(&other.to_string())),
        }
        out.push_str("</data>");
    }
    out.push_str("</result>");
    out
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
