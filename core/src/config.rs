//! Connection settings bound into a client handle.

use std::fmt;
use std::time::Duration;

/// Immutable (url, secret, database name) triple plus transport tuning.
///
/// Built once by the embedding application and shared read-only by every
/// operation issued through the handle that owns it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    url: String,
    secret: String,
    db_name: String,
    timeout: Option<Duration>,
    response_limit: Option<u64>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, secret: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: secret.into(),
            db_name: db_name.into(),
            timeout: None,
            response_limit: None,
        }
    }

    /// Bound on the whole round trip when the default `UreqTransport` is used.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Cap on the reply body size. Unbounded unless set; a larger reply is
    /// reported as a network error.
    pub fn with_response_limit(self, bytes: u64) -> Self {
        Self {
            response_limit: Some(bytes),
            ..self
        }
    }

    /// Base URL without trailing slashes.
    pub fn url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn response_limit(&self) -> Option<u64> {
        self.response_limit
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("timeout", &self.timeout)
            .field("response_limit", &self.response_limit)
            .finish()
    }
}
