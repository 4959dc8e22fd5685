//! HTTP transport seam
//!
//! The resource client talks to the network only through [`Transport`], so
//! tests and embedding hosts can substitute their own implementation.

use openapi_provider_common::{HttpMethod, ProviderError, Result};
use std::time::Duration;
use tracing::trace;

/// One outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON; an empty body is `None`
    pub fn json(&self) -> Result<Option<serde_json::Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| ProviderError::InvalidResponse(format!("Body is not JSON: {}", e)))
    }
}

/// Sends requests; any status code is a successful send
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send a request, failing only on network-level errors
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a ureq agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        trace!("ureq {} {}", request.method, request.url);

        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            HttpMethod::Post => send_json(
                with_headers(self.agent.post(url), &request.headers),
                request.body.as_ref(),
            ),
            HttpMethod::Put => send_json(
                with_headers(self.agent.put(url), &request.headers),
                request.body.as_ref(),
            ),
            HttpMethod::Patch => send_json(
                with_headers(self.agent.patch(url), &request.headers),
                request.body.as_ref(),
            ),
        };

        let mut response = result.map_err(connection_error)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(connection_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_json(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&serde_json::Value>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send_json(body),
        None => builder.send_empty(),
    }
}

fn connection_error(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Timeout(timeout) => {
            ProviderError::Connection(format!("request timed out ({:?})", timeout))
        }
        other => ProviderError::Connection(other.to_string()),
    }
}
