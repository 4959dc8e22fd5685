//! Generic CRUD client over a resource schema

use crate::codec::{self, EncodeMode};
use crate::endpoint::HttpEndpointConfig;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use openapi_provider_common::{
    HttpMethod, ProviderError, ResourceInstance, ResourceSchema, Result,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Error body returned by the remote API, when it follows `{"code", "message"}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<Value>,
    pub message: String,
}

impl ApiErrorBody {
    /// Parse an error body, `None` when it has no `message`
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

/// Issues create, read, update and delete requests for any resource type
///
/// Holds no per-resource state: every call receives the schema and endpoint
/// it operates on, so one client serves all resource types of a provider.
#[derive(Clone)]
pub struct HttpResourceClient {
    transport: Arc<dyn Transport>,
}

impl HttpResourceClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// POST the desired state and return the observed state
    ///
    /// The observed state is the desired state overlaid with the decoded
    /// response, and always carries the server-assigned identifier.
    pub fn create(
        &self,
        schema: &ResourceSchema,
        endpoint: &HttpEndpointConfig,
        desired: &ResourceInstance,
    ) -> Result<ResourceInstance> {
        let body = codec::encode(schema, desired, EncodeMode::Create)?;
        let response = self.send(
            endpoint,
            HttpMethod::Post,
            endpoint.collection_url(),
            Some(body),
        )?;
        check_status(&response)?;

        let decoded = decode_body(schema, &response)?.ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "create of {} returned an empty body",
                schema.resource_name
            ))
        })?;

        let mut observed = observed_from(schema, desired);
        observed.merge(&decoded);

        if observed.identifier(schema.identifier_name()).is_none() {
            return Err(ProviderError::InvalidResponse(format!(
                "create of {} returned no '{}'",
                schema.resource_name,
                schema.identifier_name()
            )));
        }
        Ok(observed)
    }

    /// GET one instance; `None` when the server answers 404
    pub fn read(
        &self,
        schema: &ResourceSchema,
        endpoint: &HttpEndpointConfig,
        id: &str,
    ) -> Result<Option<ResourceInstance>> {
        let response = self.send(endpoint, HttpMethod::Get, endpoint.instance_url(id), None)?;
        if response.status == 404 {
            return Ok(None);
        }
        check_status(&response)?;

        let mut observed = decode_body(schema, &response)?.ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "read of {} '{}' returned an empty body",
                schema.resource_name, id
            ))
        })?;
        ensure_identifier(schema, &mut observed, id);
        Ok(Some(observed))
    }

    /// PUT the updatable properties of the desired state
    ///
    /// An empty success body is followed by a read to obtain the observed
    /// state.
    pub fn update(
        &self,
        schema: &ResourceSchema,
        endpoint: &HttpEndpointConfig,
        id: &str,
        desired: &ResourceInstance,
    ) -> Result<ResourceInstance> {
        let body = codec::encode(schema, desired, EncodeMode::Update)?;
        let response = self.send(
            endpoint,
            HttpMethod::Put,
            endpoint.instance_url(id),
            Some(body),
        )?;
        check_status(&response)?;

        match decode_body(schema, &response)? {
            Some(mut observed) => {
                ensure_identifier(schema, &mut observed, id);
                Ok(observed)
            }
            None => self
                .read(schema, endpoint, id)?
                .ok_or_else(|| ProviderError::NotFound {
                    resource: schema.resource_name.clone(),
                    id: id.to_string(),
                }),
        }
    }

    /// DELETE one instance; an already missing instance is not an error
    pub fn delete(
        &self,
        schema: &ResourceSchema,
        endpoint: &HttpEndpointConfig,
        id: &str,
    ) -> Result<()> {
        let response = self.send(endpoint, HttpMethod::Delete, endpoint.instance_url(id), None)?;
        if response.status == 404 {
            debug!("{} '{}' already deleted", schema.resource_name, id);
            return Ok(());
        }
        check_status(&response)
    }

    fn send(
        &self,
        endpoint: &HttpEndpointConfig,
        method: HttpMethod,
        url: String,
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        let mut headers = endpoint.request_headers();
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(&request)?;
        debug!("{} {} -> {}", request.method, request.url, response.status);
        Ok(response)
    }
}

/// Map non-2xx responses onto errors
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }

    let body = match ApiErrorBody::parse(&response.body) {
        Some(error) => match error.code {
            Some(code) => format!("{} ({})", error.message, display_code(&code)),
            None => error.message,
        },
        None => response.body.clone(),
    };

    if response.status == 401 {
        Err(ProviderError::Authentication {
            status: response.status,
            body,
        })
    } else {
        Err(ProviderError::RemoteApi {
            status: response.status,
            body,
        })
    }
}

fn display_code(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_body(schema: &ResourceSchema, response: &HttpResponse) -> Result<Option<ResourceInstance>> {
    response
        .json()?
        .map(|body| codec::decode(schema, &body))
        .transpose()
}

/// The caller-managed part of the desired state
fn observed_from(schema: &ResourceSchema, desired: &ResourceInstance) -> ResourceInstance {
    let mut observed = ResourceInstance::new();
    for property in schema.properties.iter().filter(|p| !p.computed) {
        if let Some(value) = desired.get(&property.name) {
            observed.set(property.name.clone(), value.clone());
        }
    }
    observed
}

fn ensure_identifier(schema: &ResourceSchema, observed: &mut ResourceInstance, id: &str) {
    let name = schema.identifier_name();
    if observed.identifier(name).is_none() {
        observed.set(name.to_string(), Value::String(id.to_string()));
    }
}
