//! Webhook dispatch
//!
//! Sends a built [`Payload`] to one endpoint with a single POST, then writes
//! an audit record describing what happened. Only a missing endpoint is an
//! error; every network outcome is returned as a [`DispatchOutcome`].
//!
//! ```text
//! Idle -> Sending -> Delivered         (2xx response)
//!                 -> UnexpectedStatus  (any other response)
//!                 -> TransportFailed   (no response at all)
//! ```

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::audit::{AuditRecord, AuditSink};
use crate::payload::Payload;

pub mod transport;

pub use transport::{Transport, TransportError, TransportErrorKind, TransportOptions, TransportResponse, UreqTransport};

/// Settings for a single dispatch, resolved by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub endpoint: Option<String>,
    /// Carried for the caller; `Dispatcher::dispatch` does not consult it
    pub enabled: bool,
    pub insecure_skip_verify: bool,
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            enabled: true,
            insecure_skip_verify: false,
            timeout: TransportOptions::default().timeout,
        }
    }
}

impl DispatchConfig {
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }

    fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: self.timeout,
            insecure_skip_verify: self.insecure_skip_verify,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no endpoint configured")]
    ConfigurationError,
}

/// Response body, parsed as JSON when possible
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str(raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// What happened to one dispatch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 2xx response
    Delivered {
        status: u16,
        body: ResponseBody,
        raw: String,
        body_error: Option<TransportError>,
    },
    /// Response received with any other status
    UnexpectedStatus {
        status: u16,
        body: ResponseBody,
        raw: String,
        body_error: Option<TransportError>,
    },
    /// Nothing came back
    TransportFailed { error: TransportError },
}

impl DispatchOutcome {
    fn from_response(response: TransportResponse) -> Self {
        let TransportResponse {
            status,
            body: raw,
            body_error,
        } = response;
        let body = ResponseBody::parse(&raw);
        if (200..300).contains(&status) {
            Self::Delivered {
                status,
                body,
                raw,
                body_error,
            }
        } else {
            Self::UnexpectedStatus {
                status,
                body,
                raw,
                body_error,
            }
        }
    }

    /// Status code, or 0 when the connection never completed
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Delivered { status, .. } | Self::UnexpectedStatus { status, .. } => *status,
            Self::TransportFailed { .. } => 0,
        }
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            Self::Delivered { body, .. } | Self::UnexpectedStatus { body, .. } => Some(body),
            Self::TransportFailed { .. } => None,
        }
    }

    /// The failure to connect, or to read the body after a status arrived
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Delivered { body_error, .. } | Self::UnexpectedStatus { body_error, .. } => body_error.as_ref(),
            Self::TransportFailed { error } => Some(error),
        }
    }

    /// 2xx with the whole response read
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { body_error: None, .. })
    }

    /// `HTTP Code: <n>` then the raw body and any transport error
    pub fn result_line(&self) -> String {
        let detail = match self {
            Self::Delivered { raw, body_error, .. } | Self::UnexpectedStatus { raw, body_error, .. } => {
                match body_error {
                    Some(error) if raw.is_empty() => error.to_string(),
                    Some(error) => format!("{}\n{}", raw, error),
                    None => raw.clone(),
                }
            }
            Self::TransportFailed { error } => error.to_string(),
        };
        format!("HTTP Code: {}\n{}", self.http_status(), detail)
    }
}

/// Sends payloads and records each attempt
pub struct Dispatcher<T, A> {
    transport: T,
    audit: A,
}

impl<T: Transport, A: AuditSink> Dispatcher<T, A> {
    pub fn new(transport: T, audit: A) -> Self {
        Self { transport, audit }
    }

    /// POST `payload` to the configured endpoint once
    pub fn dispatch(&self, config: &DispatchConfig, payload: &Payload) -> Result<DispatchOutcome, DispatchError> {
        let endpoint = match config.endpoint.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => return Err(DispatchError::ConfigurationError),
        };

        let outcome = match payload.to_json() {
            Ok(body) => {
                let outcome = self.send(endpoint, &body, config);
                self.audit(endpoint, &body, &outcome);
                outcome
            }
            Err(e) => {
                // Plain string fields cannot fail to serialize, but the attempt is still recorded
                let outcome = DispatchOutcome::TransportFailed {
                    error: TransportError::new(TransportErrorKind::Other, format!("failed to serialize payload: {}", e)),
                };
                self.audit(endpoint, "", &outcome);
                outcome
            }
        };

        Ok(outcome)
    }

    fn send(&self, endpoint: &str, body: &str, config: &DispatchConfig) -> DispatchOutcome {
        log::info!("Dispatching notification to {}", endpoint);
        log::debug!("Payload: {}", body);

        match self.transport.post_json(endpoint, body, &config.transport_options()) {
            Ok(response) => {
                let outcome = DispatchOutcome::from_response(response);
                match outcome.transport_error() {
                    Some(error) => {
                        log::warn!("Endpoint {} answered HTTP {} but {}", endpoint, outcome.http_status(), error)
                    }
                    None if outcome.is_success() => {
                        log::info!("Delivered to {} (HTTP {})", endpoint, outcome.http_status())
                    }
                    None => log::warn!("Endpoint {} answered HTTP {}", endpoint, outcome.http_status()),
                }
                outcome
            }
            Err(error) => {
                log::warn!("Failed to reach {}: {}", endpoint, error);
                DispatchOutcome::TransportFailed { error }
            }
        }
    }

    fn audit(&self, endpoint: &str, body: &str, outcome: &DispatchOutcome) {
        let record = AuditRecord::new(endpoint, body, outcome.result_line());
        if let Err(e) = self.audit.record(&record) {
            log::warn!("Failed to write audit record for {}: {}", endpoint, e);
        }
    }
}
