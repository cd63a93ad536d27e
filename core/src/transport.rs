//! The injected network collaborator.
//!
//! # Design
//! `Transport` is the only place I/O happens. The default `UreqTransport`
//! runs ureq's blocking agent on tokio's blocking pool so the async
//! operations never stall a runtime worker. HTTP status codes come back as
//! data; interpreting them is the envelope's job.

use std::fmt;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one form-encoded POST.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post_form(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).post_form(request).await
    }
}

/// `Transport` backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    response_limit: u64,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("response_limit", &self.response_limit)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .new_agent();
        Self {
            agent,
            response_limit: config.response_limit().unwrap_or(u64::MAX),
        }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn post_form(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let limit = self.response_limit;
        tokio::task::spawn_blocking(move || execute(&agent, &request, limit))
            .await
            .map_err(|e| TransportError::Aborted(e.to_string()))?
    }
}

fn execute(agent: &ureq::Agent, request: &HttpRequest, limit: u64) -> Result<HttpResponse, TransportError> {
    let mut builder = agent.post(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let mut response = builder.send_form(
        request
            .fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    )?;
    let status = response.status().as_u16();
    // ureq caps bodies at 10 MB unless told otherwise.
    let body = response.body_mut().with_config().limit(limit).read_to_string()?;
    Ok(HttpResponse { status, body })
}
