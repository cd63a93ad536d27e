//! Response envelope normalization.
//!
//! The server answers every call with `{err?: string, data?: <payload>}`.
//! Transport failure, application error and a reply without `data` all end
//! up as "no payload"; only the log channel tells them apart.

use serde_json::Value;

use crate::error::TransportError;
use crate::http::{HttpResponse, Operation};

/// Tracing target for transport-level failures.
pub const NETWORK_TARGET: &str = "dbiler::network";
/// Tracing target for application errors and malformed replies.
pub const RESPONSE_TARGET: &str = "dbiler::response";

/// What a transport outcome turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// No usable reply: transport error, non-2xx status, or a body that is not
    /// a JSON object or array.
    Network(String),
    /// The server flagged an error in `err`.
    Rejected(String),
    /// Object reply without a `data` field, or an array reply.
    Malformed,
    Data(Value),
}

impl Envelope {
    pub fn classify(outcome: Result<HttpResponse, TransportError>) -> Envelope {
        let response = match outcome {
            Ok(response) => response,
            Err(err) => return Envelope::Network(err.to_string()),
        };
        if !response.is_success() {
            return Envelope::Network(format!("HTTP {}", response.status));
        }
        let mut body = match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(body)) => body,
            // An array reply counts as an object without `data`.
            Ok(Value::Array(_)) => return Envelope::Malformed,
            Ok(other) => return Envelope::Network(format!("expected a JSON object, got {}", kind(&other))),
            Err(err) => return Envelope::Network(format!("undecodable body: {err}")),
        };
        if let Some(err) = body.get("err").filter(|err| is_truthy(err)) {
            let message = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Envelope::Rejected(message);
        }
        match body.remove("data") {
            Some(data) => Envelope::Data(data),
            None => Envelope::Malformed,
        }
    }

    /// Log any failure for `operation` and return the payload, if there is one.
    pub fn into_payload(self, operation: Operation) -> Option<Value> {
        match self {
            Envelope::Network(reason) => {
                tracing::error!(target: NETWORK_TARGET, %operation, error = %reason, "network error");
                None
            }
            Envelope::Rejected(err) => {
                tracing::error!(target: RESPONSE_TARGET, %operation, error = %err, "response error");
                None
            }
            Envelope::Malformed => {
                tracing::error!(target: RESPONSE_TARGET, %operation, "response error: no data");
                None
            }
            Envelope::Data(data) => Some(data),
        }
    }
}

/// `null`, `false`, `0`, and `""` count as absent; everything else is present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
