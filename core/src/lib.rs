//! Dynamic client for Mailchimp-style JSON-RPC-over-HTTP APIs.
//!
//! # Overview
//! Callers invoke remote methods by name (`lists_subscribe`,
//! `helper_ping`, ...) without the crate declaring any endpoint. The name is
//! turned into a path, the API secret is merged into the JSON payload, and
//! the body is POSTed to the host for the key's region.
//!
//! # Design
//! - `Client` is immutable. Export mode is chosen per call through
//!   `Client::export()` or an explicit `ApiMode`, never stored on the client.
//! - Each call is split into `build_request` and `parse_response` around a
//!   `Transport`, so decoding is a pure function of the body and the mode.
//! - Service-declared errors (`{"error": ...}`) come back as
//!   `ChimpError::RemoteService`, never as successful values.
//! - The free functions `invoke`, `export` and `dispatch` build a client from
//!   the process-wide defaults (see `config`) and forward the call.

pub mod classify;
pub mod client;
pub mod config;
pub mod credential;
pub mod decode;
pub mod error;
pub mod http;
pub mod method;
pub mod transport;

use serde_json::Value;

pub use client::{Call, Client, Dispatched, API_KEY_FIELD, EXPORT_METHOD};
pub use config::{set_default_api_key, set_default_timeout, ClientConfig};
pub use credential::Credential;
pub use decode::{decode, decode_export, decode_standard, DecodedResponse, Record};
pub use error::{ChimpError, Result};
pub use http::{HttpRequest, HttpResponse};
pub use method::{ApiMode, RemoteMethod};
pub use transport::{Transport, UreqTransport};

/// Invoke `method` on a client built from the process-wide defaults.
pub fn invoke(method: &str, payload: Option<Value>) -> Result<Value> {
    Client::from_defaults()?.invoke(method, payload)
}

/// Export-mode call on a client built from the process-wide defaults.
pub fn export() -> Result<Call> {
    Ok(Client::from_defaults()?.export())
}

/// Positional dispatch on a client built from the process-wide defaults.
pub fn dispatch(name: &str, args: Vec<Value>) -> Result<Dispatched> {
    Client::from_defaults()?.dispatch(name, args)
}
