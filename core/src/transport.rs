//! The network seam.
//!
//! # Design
//! `Client` only ever hands a finished `HttpRequest` to a `Transport` and
//! gets an `HttpResponse` back; decoding happens afterwards. `UreqTransport`
//! is the blocking default. Tests plug in their own implementations.

use std::io;
use std::time::Duration;

use tracing::debug;

use crate::error::{ChimpError, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Performs a single POST round-trip. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by `ureq`.
///
/// The same timeout bounds connection setup and the whole request.
/// 4xx/5xx responses are returned as data rather than `Err`, since the
/// service describes its failures in the body.
///
/// Bodies are read without a size cap by default; bulk exports routinely
/// exceed ureq's 10 MiB default. `with_body_limit` sets one.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Duration,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            timeout,
            body_limit: u64::MAX,
        }
    }

    /// Refuse response bodies larger than `bytes`.
    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn body_limit(&self) -> u64 {
        self.body_limit
    }

    fn map_error(&self, err: ureq::Error) -> ChimpError {
        match err {
            ureq::Error::Timeout(_) => ChimpError::TransportTimeout {
                timeout: self.timeout,
            },
            ureq::Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                ChimpError::TransportTimeout {
                    timeout: self.timeout,
                }
            }
            other => ChimpError::Transport(other.to_string()),
        }
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_string()
            .map_err(|e| self.map_error(e))?;

        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
