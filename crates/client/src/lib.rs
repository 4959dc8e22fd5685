//! Schema-driven HTTP client for OpenAPI Provider resources
//!
//! [`HttpResourceClient`] maps the four CRUD operations of any resource onto
//! JSON requests against its collection and instance URLs. Request and
//! response bodies are translated by the [`codec`] using the resource's
//! [`ResourceSchema`](openapi_provider_common::ResourceSchema), and all network
//! traffic goes through a [`Transport`].

mod client;
pub mod codec;
mod endpoint;
mod transport;

pub use client::{ApiErrorBody, HttpResourceClient};
pub use codec::EncodeMode;
pub use endpoint::HttpEndpointConfig;
pub use transport::{HttpRequest, HttpResponse, Transport, UreqTransport};
