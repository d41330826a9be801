//! Dynamic dispatcher for the remote API.
//!
//! # Design
//! Any method name is accepted and turned into an endpoint path by string
//! splitting, so nothing is declared per endpoint. Each call is split into
//! `build_request` (produces an `HttpRequest`), a `Transport` round-trip, and
//! `parse_response` (decode, then check for a service-declared error).
//!
//! Export mode is a per-call value, never state on the client. `export()`
//! returns a `Call` carrying the flag, and `Call::invoke` consumes it, so
//! the flag covers exactly one invocation and clones of a client never
//! observe each other's choice.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::decode::{decode, DecodedResponse};
use crate::error::{ChimpError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::method::{ApiMode, RemoteMethod};
use crate::transport::{Transport, UreqTransport};

/// Method name that selects export mode for the next call instead of
/// reaching the service.
pub const EXPORT_METHOD: &str = "export";

/// Payload field carrying the API secret.
pub const API_KEY_FIELD: &str = "apikey";

/// Client for one API key.
///
/// Immutable once built and cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Client {
    credential: Credential,
    base_url: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Build a client using the blocking `ureq` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let timeout = config.resolved_timeout()?;
        Self::with_transport(config, Arc::new(UreqTransport::new(timeout)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let raw = config.resolved_api_key();
        let credential = Credential::parse(raw.as_deref())?;
        let base_url = match &config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}", credential.host(config.resolved_domain())),
        };

        Ok(Self {
            credential,
            base_url,
            timeout: config.resolved_timeout()?,
            transport,
        })
    }

    /// Build a client from the process-wide defaults and the environment.
    pub fn from_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke `method` on the standard surface.
    pub fn invoke(&self, method: &str, payload: Option<Value>) -> Result<Value> {
        self.invoke_with(method, payload, ApiMode::Standard)
    }

    /// Invoke `method` on the surface selected by `mode`.
    pub fn invoke_with(&self, method: &str, payload: Option<Value>, mode: ApiMode) -> Result<Value> {
        self.invoke_decoded(method, payload, mode).map(|decoded| decoded.body)
    }

    /// Like `invoke_with`, also handing back the raw body.
    pub fn invoke_decoded(&self, method: &str, payload: Option<Value>, mode: ApiMode) -> Result<DecodedResponse> {
        let request = self.build_request(method, payload, mode)?;
        let response = self.transport.post(&request)?;
        self.parse_decoded(response, mode)
    }

    /// Select export mode for exactly one subsequent call.
    pub fn export(&self) -> Call {
        Call {
            client: self.clone(),
            mode: ApiMode::Export,
        }
    }

    /// Positional entry point: `dispatch(name, [payload?, export?])`.
    ///
    /// `"export"` takes no arguments and yields a pending `Call`; every other
    /// name is sent to the service.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Dispatched> {
        self.dispatch_in(name, args, ApiMode::Standard)
    }

    fn dispatch_in(&self, name: &str, args: Vec<Value>, pending: ApiMode) -> Result<Dispatched> {
        if name == EXPORT_METHOD {
            if !args.is_empty() {
                return Err(ChimpError::ArgumentCount {
                    given: args.len(),
                    expected: 0,
                });
            }
            return Ok(Dispatched::Pending(self.export()));
        }

        if args.len() > 2 {
            return Err(ChimpError::ArgumentCount {
                given: args.len(),
                expected: 2,
            });
        }

        let mut args = args.into_iter();
        let payload = args.next().filter(|v| !v.is_null());
        let mode = match args.next() {
            None | Some(Value::Null) => pending,
            Some(Value::Bool(export)) => ApiMode::from(export),
            Some(other) => {
                return Err(ChimpError::InvalidPayload(format!(
                    "export override must be a boolean, got {other}"
                )))
            }
        };

        self.invoke_with(name, payload, mode).map(Dispatched::Complete)
    }

    /// Build the POST for `method`, merging the API secret into `payload`.
    pub fn build_request(&self, method: &str, payload: Option<Value>, mode: ApiMode) -> Result<HttpRequest> {
        if method == EXPORT_METHOD {
            return Err(ChimpError::InvalidPayload(format!(
                "'{EXPORT_METHOD}' is reserved; use Client::export to select export mode"
            )));
        }

        let mut body = match payload {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ChimpError::InvalidPayload(format!(
                    "payload must be a JSON object, got {other}"
                )))
            }
        };
        body.insert(
            API_KEY_FIELD.to_string(),
            Value::String(self.credential.secret().to_string()),
        );

        let path = RemoteMethod::parse(method).path(mode);
        debug!(method, %path, ?mode, "dispatching call");

        Ok(HttpRequest {
            url: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(&body)?,
        })
    }

    /// Decode `response` for `mode` and surface any service-declared error.
    pub fn parse_response(&self, response: HttpResponse, mode: ApiMode) -> Result<Value> {
        self.parse_decoded(response, mode).map(|decoded| decoded.body)
    }

    /// `parse_response`, keeping the raw body next to the decoded one. On
    /// failure the raw body is logged at debug level.
    pub fn parse_decoded(&self, response: HttpResponse, mode: ApiMode) -> Result<DecodedResponse> {
        let status = response.status;
        trace!(status, body = %response.body, "raw response");

        let DecodedResponse { raw, body } = match decode(&response.body, mode) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(status, error = %err, "undecodable response");
                debug!(raw = %response.body, "undecodable response body");
                return Err(err);
            }
        };

        match classify(body, mode) {
            Ok(body) => Ok(DecodedResponse { raw, body }),
            Err(err) => {
                warn!(status, error = %err, "service returned an error");
                debug!(%raw, "service error body");
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A single pending invocation carrying its API mode.
#[derive(Debug, Clone)]
#[must_use = "a Call does nothing until invoked"]
pub struct Call {
    client: Client,
    mode: ApiMode,
}

impl Call {
    pub fn mode(&self) -> ApiMode {
        self.mode
    }

    pub fn invoke(self, method: &str, payload: Option<Value>) -> Result<Value> {
        self.client.invoke_with(method, payload, self.mode)
    }

    pub fn invoke_decoded(self, method: &str, payload: Option<Value>) -> Result<DecodedResponse> {
        self.client.invoke_decoded(method, payload, self.mode)
    }

    /// Like `Client::dispatch`, defaulting to this call's mode.
    pub fn dispatch(self, name: &str, args: Vec<Value>) -> Result<Dispatched> {
        self.client.dispatch_in(name, args, self.mode)
    }
}

/// Outcome of `Client::dispatch`.
#[derive(Debug)]
pub enum Dispatched {
    /// `"export"` was invoked; the returned call runs in export mode.
    Pending(Call),
    /// The service answered.
    Complete(Value),
}

impl Dispatched {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Dispatched::Complete(value) => Some(value),
            Dispatched::Pending(_) => None,
        }
    }

    pub fn into_call(self) -> Option<Call> {
        match self {
            Dispatched::Pending(call) => Some(call),
            Dispatched::Complete(_) => None,
        }
    }
}
