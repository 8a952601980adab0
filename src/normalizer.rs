//! Input normalization
//!
//! Turns the raw `input_query` of a step into a canonical character
//! description. Payloads are classified before parsing so that text which
//! merely looks like JSON is its own branch:
//!
//! - [`Payload::RawText`] passes through unchanged.
//! - [`Payload::StructuredText`] is parsed as a flat JSON object and rendered
//!   one `key: value` line per attribute, in the order the keys appear.
//!   A parse failure yields no description at all.
//!
//! An absent or blank description is a [`Error::Validation`].

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Classified raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    RawText(&'a str),
    StructuredText(&'a str),
}

/// Canonical description handed to the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterDescription {
    Attributes(Vec<(String, String)>),
    Freeform(String),
}

impl CharacterDescription {
    pub fn render(&self) -> String {
        match self {
            CharacterDescription::Attributes(pairs) => pairs
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("\n"),
            CharacterDescription::Freeform(text) => text.clone(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            CharacterDescription::Attributes(pairs) => pairs.is_empty(),
            CharacterDescription::Freeform(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for CharacterDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Decide how a payload should be read
pub fn classify(raw: &str) -> Payload<'_> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.starts_with('{') && trimmed.ends_with('}') {
        Payload::StructuredText(raw)
    } else {
        Payload::RawText(raw)
    }
}

/// Parse a structured payload into ordered attribute pairs
///
/// Returns `None` when the text is not a JSON object.
pub fn parse_attributes(text: &str) -> Option<Vec<(String, String)>> {
    match serde_json::from_str::<IndexMap<String, Value>>(text.trim()) {
        Ok(map) => Some(
            map.into_iter()
                .map(|(key, value)| (key, render_value(&value)))
                .collect(),
        ),
        Err(e) => {
            warn!("Error decoding JSON character payload: {}", e);
            None
        }
    }
}

/// Strings render bare; everything else renders as compact JSON (`true`,
/// `null`, `["elf","archer"]`) rather than any host-language repr.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize an optional raw payload into a description
pub fn normalize(raw: Option<&str>) -> Result<CharacterDescription> {
    let description = raw.and_then(|raw| match classify(raw) {
        Payload::RawText(text) => Some(CharacterDescription::Freeform(text.to_string())),
        Payload::StructuredText(text) => {
            parse_attributes(text).map(CharacterDescription::Attributes)
        }
    });

    match description {
        Some(description) if !description.is_blank() => {
            debug!("Character description:\n{}", description);
            Ok(description)
        }
        _ => Err(Error::Validation(
            "No character data provided.".to_string(),
        )),
    }
}
