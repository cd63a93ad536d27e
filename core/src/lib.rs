//! Async client for a dbiler document-store service.
//!
//! # Overview
//! A dbiler server exposes `insert`, `find`, `findOne`, `count`, `update`,
//! `remove` and `save` as form-encoded POST endpoints. Every request carries
//! the shared `secret` and the `dbName`; structured arguments travel as JSON
//! text inside form fields, and replies come back as `{err?, data?}`
//! envelopes.
//!
//! # Design
//! - `DbClient` is stateless: `build_*` produces an `HttpRequest`, `parse_*`
//!   consumes the transport outcome. No I/O happens there.
//! - `Transport` is the injected network seam; `UreqTransport` is the default.
//! - `Dbiler` ties the two together into one async method per operation.
//! - Failures never reach the caller. They are logged through `tracing`
//!   (targets `dbiler::network`, `dbiler::response`, `dbiler::request`) and
//!   the operation resolves to its default value.
//!
//! ```no_run
//! use dbiler_core::{ClientConfig, Dbiler};
//! use serde_json::{json, Value};
//!
//! # async fn demo() {
//! let db = Dbiler::connect(ClientConfig::new("http://localhost:3000", "secret", "users"));
//! let id = db.insert(&json!({"name": "Ada"})).await;
//! let docs: Vec<Value> = db.find(&json!({"name": "Ada"}), &json!({})).await;
//! assert_eq!(docs.len(), usize::from(id.is_some()));
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dbiler;
pub mod envelope;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{DbClient, Outcome};
pub use config::ClientConfig;
pub use dbiler::Dbiler;
pub use envelope::Envelope;
pub use error::{BuildError, TransportError};
pub use http::{HttpRequest, HttpResponse, Operation};
pub use transport::{Transport, UreqTransport};
