//! HTTP transport for webhook delivery

use std::time::{Duration, Instant};

use thiserror::Error;
use ureq::Agent;
use ureq::http::Uri;
use ureq::tls::TlsConfig;

/// Per-request transport settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound on the whole request, connect through body read
    pub timeout: Duration,
    /// Skip certificate and hostname verification
    pub insecure_skip_verify: bool,
    pub max_redirects: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            insecure_skip_verify: false,
            max_redirects: 10,
        }
    }
}

/// A response that made it back, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    /// Set when the status arrived but the body could not be read in full
    pub body_error: Option<TransportError>,
}

/// Why a request never produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Timeout,
    Tls,
    Redirect,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sends a JSON body to an endpoint
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        endpoint: &str,
        body: &str,
        options: &TransportOptions,
    ) -> Result<TransportResponse, TransportError>;
}

/// Blocking transport backed by `ureq`
///
/// A fresh agent is built for every hop, so concurrent dispatches never
/// share connections. Redirects are followed here rather than by `ureq` so
/// that 307 and 308 re-send the original body.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(options: &TransportOptions, timeout: Duration) -> Agent {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .max_redirects(0)
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(options.insecure_skip_verify)
                    .build(),
            )
            .build();

        config.into()
    }
}

impl Transport for UreqTransport {
    fn post_json(
        &self,
        endpoint: &str,
        body: &str,
        options: &TransportOptions,
    ) -> Result<TransportResponse, TransportError> {
        let deadline = Instant::now() + options.timeout;
        let mut url = endpoint.to_string();
        let mut method = Method::Post;
        let mut hops = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    format!("timed out after {:?} following redirects", options.timeout),
                ));
            }
            let agent = Self::agent(options, remaining);

            let mut response = match method {
                Method::Post => agent
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .send(body.as_bytes()),
                Method::Get => agent.get(&url).call(),
            }
            .map_err(classify)?;

            let status = response.status().as_u16();
            if let Some(next) = redirect_method(status, method) {
                let location = response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        TransportError::new(
                            TransportErrorKind::Redirect,
                            format!("HTTP {} from {} without a Location header", status, url),
                        )
                    })?;

                if hops >= options.max_redirects {
                    return Err(TransportError::new(
                        TransportErrorKind::Redirect,
                        format!("more than {} redirects", options.max_redirects),
                    ));
                }

                let target = resolve_location(&url, location).ok_or_else(|| {
                    TransportError::new(
                        TransportErrorKind::Redirect,
                        format!("invalid redirect location '{}'", location),
                    )
                })?;
                log::debug!("HTTP {} from {}, following to {}", status, url, target);

                url = target;
                method = next;
                hops += 1;
                continue;
            }

            let (body, body_error) = match response.body_mut().read_to_string() {
                Ok(text) => (text, None),
                Err(e) => {
                    log::warn!("Failed to read response body from {}: {}", url, e);
                    (String::new(), Some(classify(e)))
                }
            };

            return Ok(TransportResponse {
                status,
                body,
                body_error,
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Post,
    Get,
}

/// Method for the next hop, or `None` when `status` is not a redirect
///
/// 307 and 308 keep the method and body; 301, 302 and 303 continue as GET.
fn redirect_method(status: u16, current: Method) -> Option<Method> {
    match status {
        301 | 302 | 303 => Some(Method::Get),
        307 | 308 => Some(current),
        _ => None,
    }
}

/// Resolve a `Location` header against the URL that returned it
fn resolve_location(base: &str, location: &str) -> Option<String> {
    if location.contains("://") {
        return location.parse::<Uri>().ok().map(|_| location.to_string());
    }

    let base: Uri = base.parse().ok()?;
    let scheme = base.scheme_str()?;
    let authority = base.authority()?.as_str();

    if let Some(rest) = location.strip_prefix("//") {
        return Some(format!("{}://{}", scheme, rest));
    }
    if location.starts_with('/') {
        return Some(format!("{}://{}{}", scheme, authority, location));
    }

    let dir = match base.path().rfind('/') {
        Some(i) => &base.path()[..=i],
        None => "/",
    };
    Some(format!("{}://{}{}{}", scheme, authority, dir, location))
}

fn classify(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::Tls(_) => TransportErrorKind::Tls,
        ureq::Error::TooManyRedirects | ureq::Error::RedirectFailed => TransportErrorKind::Redirect,
        ureq::Error::Io(io) => match io.kind() {
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => TransportErrorKind::Connect,
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Other,
        },
        _ => TransportErrorKind::Other,
    };

    TransportError::new(kind, err.to_string())
}
