//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Every dbiler call is a single form-encoded POST. `DbClient` describes it as
//! an `HttpRequest` and interprets the reply from an `HttpResponse`; executing
//! the round trip belongs to a `Transport`. Structured arguments are already
//! JSON text by the time they land in `fields`, so the request is a flat list
//! of string pairs and nothing else.

use std::fmt;

/// One of the seven remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Find,
    FindOne,
    Count,
    Update,
    Remove,
    Save,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Insert,
        Operation::Find,
        Operation::FindOne,
        Operation::Count,
        Operation::Update,
        Operation::Remove,
        Operation::Save,
    ];

    /// Sub-path appended to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Operation::Insert => "/insert",
            Operation::Find => "/find",
            Operation::FindOne => "/find-one",
            Operation::Count => "/count",
            Operation::Update => "/update",
            Operation::Remove => "/remove",
            Operation::Save => "/save",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Find => "find",
            Operation::FindOne => "findOne",
            Operation::Count => "count",
            Operation::Update => "update",
            Operation::Remove => "remove",
            Operation::Save => "save",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A form-encoded POST described as plain data.
///
/// Built by `DbClient::build_*`. Field order is stable: `secret`, `dbName`,
/// then the operation's own fields in signature order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub operation: Operation,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub fields: Vec<(String, String)>,
}

impl HttpRequest {
    /// Value of the form field `name`, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A reply as handed back by the transport. The body is still raw text; the
/// envelope is decoded by `Envelope::classify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// A 200 reply carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
