//! Event model supplied by the upstream event source
//!
//! Events are read-only inputs: a title, a message, a canonical URL and an
//! ordered list of attributes describing the thing that happened.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// A notification raised by the event source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    pub title: String,
    pub message: String,
    pub url: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A single labelled value attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribute {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form presentation hint, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Attribute {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

impl Event {
    /// Parse an event from its JSON representation
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse event JSON")
    }

    /// Read an event from a file, or from stdin when no path is given
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(p) => fs::read_to_string(p).context(format!("Failed to read event from {}", p.display()))?,
            None => {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read event from stdin")?;
                buffer
            }
        };

        Self::from_json(&content)
    }
}
