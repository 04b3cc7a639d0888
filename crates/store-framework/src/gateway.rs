//! # RPC Gateway
//!
//! The uniform call boundary between stores and the backend. Two things live here:
//!
//! - [`RpcGateway`], which appends the resolved credential as the final argument of every
//!   procedure call and hands the call to an [`RpcTransport`].
//! - [`normalize_error`], the one place where the many shapes a backend failure can take are
//!   turned into a single display string.
//!
//! ## Normalization precedence
//!
//! | Step | Source                                                   |
//! |------|----------------------------------------------------------|
//! | 1    | the failure is already a string                          |
//! | 2    | a `message` field                                        |
//! | 3    | a nested `error` field (string or `.message`)            |
//! | 4    | a nested `data` field (string, `.error` or `.message`)   |
//! | 5    | stringification, `"Error:"` prefix stripped              |
//! | 6    | JSON serialization, unless `{}` or longer than the cap   |
//! | 7    | `"Unknown error"`                                        |
//!
//! ```rust
//! use serde_json::json;
//! use store_framework::gateway::{normalize_error, RpcFailure};
//!
//! let failure = RpcFailure::Structured(json!({ "error": { "message": "x" } }));
//! assert_eq!(normalize_error(&failure), "x");
//! ```

use crate::credential::Credential;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Message used when nothing better can be extracted from a failure.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Serialized failures at or above this length are not shown to the user.
pub const JSON_LENGTH_CAP: usize = 500;

/// A raw backend failure, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcFailure {
    /// The backend rejected the call with a plain message.
    Text(String),
    /// The backend rejected the call with a structured payload.
    Structured(Value),
    /// A foreign error known only through its rendered form (e.g. `"Error: connection reset"`).
    Opaque(String),
}

impl RpcFailure {
    pub fn text(msg: impl Into<String>) -> Self {
        Self::Text(msg.into())
    }

    pub fn opaque(err: impl fmt::Display) -> Self {
        Self::Opaque(err.to_string())
    }
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&normalize_error(self))
    }
}

impl std::error::Error for RpcFailure {}

impl From<RpcFailure> for StoreError {
    fn from(failure: RpcFailure) -> Self {
        StoreError::BackendRejected(normalize_error(&failure))
    }
}

/// Turns any backend failure into one display string. Pure and deterministic.
pub fn normalize_error(failure: &RpcFailure) -> String {
    match failure {
        RpcFailure::Text(msg) if !msg.is_empty() => msg.clone(),
        RpcFailure::Text(_) => UNKNOWN_ERROR.to_string(),
        RpcFailure::Opaque(rendered) => {
            strip_error_prefix(rendered).unwrap_or_else(|| UNKNOWN_ERROR.to_string())
        }
        RpcFailure::Structured(value) => normalize_value(value),
    }
}

fn normalize_value(value: &Value) -> String {
    if !truthy(value) {
        return UNKNOWN_ERROR.to_string();
    }
    if let Value::String(msg) = value {
        return msg.clone();
    }

    if let Some(message) = field(value, "message") {
        return render(message);
    }

    if let Some(error) = field(value, "error") {
        if let Value::String(msg) = error {
            return msg.clone();
        }
        if let Some(message) = field(error, "message") {
            return render(message);
        }
    }

    if let Some(data) = field(value, "data") {
        if let Value::String(msg) = data {
            return msg.clone();
        }
        if let Some(error) = field(data, "error") {
            return match error {
                Value::String(msg) => msg.clone(),
                other => field(other, "message")
                    .map(render)
                    .unwrap_or_else(|| render(other)),
            };
        }
        if let Some(message) = field(data, "message") {
            return render(message);
        }
    }

    if let Some(msg) = stringify(value).and_then(|s| strip_error_prefix(&s)) {
        return msg;
    }

    let serialized = value.to_string();
    if serialized != "{}" && serialized.len() < JSON_LENGTH_CAP {
        return serialized;
    }

    UNKNOWN_ERROR.to_string()
}

/// Looks up a field that is present and carries a meaningful value.
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_object()?.get(key).filter(|v| truthy(v))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The plain-text rendering of a value; objects have none worth showing.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    Value::Object(_) => "[object Object]".to_string(),
                    other => stringify(other).unwrap_or_default(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Keeps the text after an `"Error:"` marker; empty renderings are unusable.
fn strip_error_prefix(rendered: &str) -> Option<String> {
    let msg = match rendered.split("Error:").nth(1) {
        Some(after) => after.trim(),
        None => rendered.trim(),
    };
    (!msg.is_empty()).then(|| msg.to_string())
}

/// The transport underneath the gateway: invokes one named backend procedure.
///
/// Implementations decide how the call travels (in-process, IPC, HTTP). The gateway only
/// relies on the calling convention `procedure(...domain_args, credential)`.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn invoke(&self, procedure: &str, args: Vec<Value>) -> Result<Value, RpcFailure>;
}

/// Calls backend procedures with the credential appended as the final argument.
#[derive(Clone)]
pub struct RpcGateway {
    transport: Arc<dyn RpcTransport>,
}

impl fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcGateway").finish_non_exhaustive()
    }
}

impl RpcGateway {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self, args, credential), fields(args = args.len()))]
    pub async fn call(
        &self,
        procedure: &str,
        mut args: Vec<Value>,
        credential: &Credential,
    ) -> Result<Value, RpcFailure> {
        args.push(Value::String(credential.as_str().to_owned()));
        debug!("Invoking procedure");
        let result = self.transport.invoke(procedure, args).await;
        if let Err(failure) = &result {
            warn!(error = %failure, "Procedure failed");
        }
        result
    }
}
