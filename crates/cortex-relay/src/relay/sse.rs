// SSE line grammar as seen by the relay: one upstream line in, one
// downstream chunk out.

use serde_json::{json, Value};

use super::filter::FieldFilter;

pub const EVENT_PREFIX: &str = "event:";
pub const DATA_PREFIX: &str = "data:";
pub const ERROR_EVENT: &str = "error";

/// A single upstream line, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Event boundary.
    Blank,
    /// `event:` line, carrying the trimmed event name.
    Event(&'a str),
    /// `data:` line, carrying the trimmed payload.
    Data(&'a str),
    /// Anything else; forwarded verbatim.
    Other(&'a str),
}

impl<'a> SseLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.trim().is_empty() {
            SseLine::Blank
        } else if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            SseLine::Event(name.trim())
        } else if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            SseLine::Data(payload.trim())
        } else {
            SseLine::Other(line)
        }
    }
}

/// Payload of a `data:` line: structured when it parses, raw otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(raw.to_string()),
        }
    }

    pub fn filtered(self, filter: &FieldFilter) -> Self {
        match self {
            Payload::Json(value) => Payload::Json(filter.apply(value)),
            text => text,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Payload::Json(value) => value.to_string(),
            Payload::Text(text) => text.clone(),
        }
    }
}

/// Re-serialize one upstream line for the downstream client, newline included.
pub fn render_line(line: &str, filter: &FieldFilter) -> String {
    match SseLine::classify(line) {
        SseLine::Blank => "\n".to_string(),
        SseLine::Event(name) => format!("{} {}\n", EVENT_PREFIX, name),
        SseLine::Data(raw) => {
            let payload = Payload::parse(raw).filtered(filter);
            format!("{} {}\n", DATA_PREFIX, payload.render())
        }
        SseLine::Other(line) => format!("{}\n", line),
    }
}

/// The terminal in-band event sent when the upstream stream fails.
pub fn error_event(description: &str) -> String {
    let data = json!({ "error": description });
    format!("{} {}\n{} {}\n\n", EVENT_PREFIX, ERROR_EVENT, DATA_PREFIX, data)
}
