//! Stateless request builder and response parser for the dbiler protocol.
//!
//! # Design
//! `DbClient` holds only its `ClientConfig` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes the
//! transport outcome. The caller (or `Dbiler`) executes the round trip in
//! between, keeping this layer deterministic and free of I/O.
//!
//! Every `parse_*` returns a plain value, never an error: a failed call
//! resolves to the operation's default (`None`, empty `Vec`, `0`, `false`),
//! which is also what a genuinely empty result looks like.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::envelope::{is_truthy, Envelope, RESPONSE_TARGET};
use crate::error::{BuildError, TransportError};
use crate::http::{HttpRequest, HttpResponse, Operation};

/// What a `Transport` hands back for one request.
pub type Outcome = Result<HttpResponse, TransportError>;

/// Synchronous, stateless client for one remote database.
#[derive(Debug, Clone)]
pub struct DbClient {
    config: ClientConfig,
}

impl DbClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_insert<D: Serialize + ?Sized>(&self, doc: &D) -> Result<HttpRequest, BuildError> {
        Ok(self.request(Operation::Insert, vec![encode("doc", doc)?]))
    }

    pub fn build_find<Q, P>(&self, query: &Q, projection: &P) -> Result<HttpRequest, BuildError>
    where
        Q: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        Ok(self.request(
            Operation::Find,
            vec![encode("query", query)?, encode("projection", projection)?],
        ))
    }

    pub fn build_find_one<Q, P>(&self, query: &Q, projection: &P) -> Result<HttpRequest, BuildError>
    where
        Q: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        Ok(self.request(
            Operation::FindOne,
            vec![encode("query", query)?, encode("projection", projection)?],
        ))
    }

    pub fn build_count<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<HttpRequest, BuildError> {
        Ok(self.request(Operation::Count, vec![encode("query", query)?]))
    }

    pub fn build_update<Q, U, O>(&self, query: &Q, update: &U, options: &O) -> Result<HttpRequest, BuildError>
    where
        Q: Serialize + ?Sized,
        U: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        Ok(self.request(
            Operation::Update,
            vec![
                encode("query", query)?,
                encode("update", update)?,
                encode("options", options)?,
            ],
        ))
    }

    pub fn build_remove<Q, O>(&self, query: &Q, options: &O) -> Result<HttpRequest, BuildError>
    where
        Q: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        Ok(self.request(
            Operation::Remove,
            vec![encode("query", query)?, encode("options", options)?],
        ))
    }

    pub fn build_save(&self) -> HttpRequest {
        self.request(Operation::Save, Vec::new())
    }

    /// Identifier of the inserted document.
    pub fn parse_insert(&self, outcome: Outcome) -> Option<String> {
        payload(Operation::Insert, outcome)
    }

    pub fn parse_find<D: DeserializeOwned>(&self, outcome: Outcome) -> Vec<D> {
        payload(Operation::Find, outcome).unwrap_or_default()
    }

    pub fn parse_find_one<D: DeserializeOwned>(&self, outcome: Outcome) -> Option<D> {
        payload(Operation::FindOne, outcome)
    }

    pub fn parse_count(&self, outcome: Outcome) -> u64 {
        payload(Operation::Count, outcome).unwrap_or_default()
    }

    /// Number of documents updated.
    pub fn parse_update(&self, outcome: Outcome) -> u64 {
        payload(Operation::Update, outcome).unwrap_or_default()
    }

    /// Number of documents removed.
    pub fn parse_remove(&self, outcome: Outcome) -> u64 {
        payload(Operation::Remove, outcome).unwrap_or_default()
    }

    /// Whether the server persisted the database.
    pub fn parse_save(&self, outcome: Outcome) -> bool {
        payload(Operation::Save, outcome).unwrap_or_default()
    }

    fn request(&self, operation: Operation, extra: Vec<(String, String)>) -> HttpRequest {
        let mut fields = Vec::with_capacity(2 + extra.len());
        fields.push(("secret".to_string(), self.config.secret().to_string()));
        fields.push(("dbName".to_string(), self.config.db_name().to_string()));
        fields.extend(extra);
        HttpRequest {
            operation,
            url: format!("{}{}", self.config.url(), operation.path()),
            headers: Vec::new(),
            fields,
        }
    }
}

/// Serialize one structured argument into its JSON text form field.
fn encode<T: Serialize + ?Sized>(field: &'static str, value: &T) -> Result<(String, String), BuildError> {
    let text = serde_json::to_string(value).map_err(|source| BuildError::Serialization { field, source })?;
    Ok((field.to_string(), text))
}

/// Normalize the outcome, drop falsy payloads, and decode the rest into `T`.
fn payload<T: DeserializeOwned>(operation: Operation, outcome: Outcome) -> Option<T> {
    let data = Envelope::classify(outcome)
        .into_payload(operation)
        .filter(is_truthy)?;
    decode(operation, data)
}

fn decode<T: DeserializeOwned>(operation: Operation, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(target: RESPONSE_TARGET, %operation, error = %err, "response error: unexpected data");
            None
        }
    }
}
