//! Error types for the dbiler client.
//!
//! # Design
//! None of these reach callers of the async operations: a failed round trip
//! resolves to the operation's default value. They exist for the seams that
//! can fail on their own, namely request building and the `Transport`
//! implementations, so custom transports have a typed way to report failure.

use thiserror::Error;

/// Failure to deliver a request or receive a reply.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP library failed (DNS, connect, TLS, timeout, body read).
    #[error("http: {0}")]
    Http(#[from] ureq::Error),

    /// The blocking task running the request was cancelled or panicked.
    #[error("transport task aborted: {0}")]
    Aborted(String),

    /// Failure reported by a custom `Transport` implementation.
    #[error("{0}")]
    Other(String),
}

/// Failure to turn operation arguments into form fields.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("serializing `{field}` failed: {source}")]
    Serialization {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
