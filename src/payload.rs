//! Outbound webhook payload
//!
//! Flattens an [`Event`] into the fixed JSON shape receivers expect. Field
//! order follows declaration order, and absent attribute fields become empty
//! strings so every payload carries the same keys.

use serde::{Deserialize, Serialize};

use crate::event::{Attribute, Event};

/// JSON document POSTed to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub event_title: String,
    pub event_url: String,
    pub event_message: String,
    pub event_params: Vec<PayloadParam>,
}

/// One attribute, with every field present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadParam {
    pub label: String,
    pub value: String,
    pub url: String,
    pub style: String,
    pub icon: String,
}

impl From<&Attribute> for PayloadParam {
    fn from(attr: &Attribute) -> Self {
        Self {
            label: attr.label.clone(),
            value: attr.value.clone(),
            url: attr.url.clone().unwrap_or_default(),
            style: attr.style.clone().unwrap_or_default(),
            icon: attr.icon.clone().unwrap_or_default(),
        }
    }
}

/// Build the payload for an event and its attributes
pub fn build(event: &Event, attributes: &[Attribute]) -> Payload {
    Payload {
        event_title: event.title.clone(),
        event_url: event.url.clone(),
        event_message: event.message.clone(),
        event_params: attributes.iter().map(PayloadParam::from).collect(),
    }
}

impl Payload {
    /// Build the payload from an event's own attribute list
    pub fn from_event(event: &Event) -> Self {
        build(event, &event.attributes)
    }

    /// Compact JSON body as sent on the wire
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
