//! Provider assembly: one registered resource type per CRUD-compliant path

use crate::lifecycle::ResourceLifecycle;
use openapi_provider_client::{HttpEndpointConfig, HttpResourceClient, Transport, UreqTransport};
use openapi_provider_common::{ProviderConfig, ProviderError, ResourceSchema, Result};
use openapi_provider_parser::{
    OpenApiDocument, OpenApiParser, ResourceDescriptor, SchemaSynthesizer, SpecAnalyser,
    SynthesisWarning,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A registered resource type
#[derive(Clone)]
pub struct RegisteredResource {
    /// Full type name, `{provider}_{resource}`
    pub type_name: String,
    pub description: Option<String>,
    pub lifecycle: ResourceLifecycle,
    pub warnings: Vec<SynthesisWarning>,
}

/// Every resource type discovered in one OpenAPI document
///
/// Assembly either succeeds completely or fails; there is no partially
/// assembled provider.
pub struct Provider {
    name: String,
    resources: BTreeMap<String, RegisteredResource>,
}

impl Provider {
    /// Load the configured document and assemble the provider
    pub fn build(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let source = config.spec_source()?;
        let parser = OpenApiParser::load(&source, config.timeout())?;
        info!("Loaded OpenAPI document from {}", parser.source());

        let transport = Arc::new(UreqTransport::new(config.timeout()));
        Self::from_document(config, parser.document(), transport)
    }

    /// Assemble from an already loaded document, sending requests through `transport`
    pub fn from_document(
        config: &ProviderConfig,
        document: &OpenApiDocument,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let analyser = SpecAnalyser::new(document);
        let synthesizer = SchemaSynthesizer::new(document);

        let base_url = config
            .base_url
            .clone()
            .or_else(|| analyser.base_url())
            .ok_or_else(|| {
                ProviderError::Config(
                    "No base URL configured and the document declares no server".to_string(),
                )
            })?;
        let api_key_header = config
            .api_key_header
            .clone()
            .unwrap_or_else(|| analyser.api_key_header());
        if config.api_key.is_none() {
            warn!("No API key configured; requests are sent without '{}'", api_key_header);
        }

        let client = HttpResourceClient::new(transport);
        let mut resources = BTreeMap::new();

        for descriptor in analyser.resources() {
            let synthesis = synthesizer.synthesize_descriptor(&descriptor)?;
            let endpoint = endpoint_for(config, &base_url, &api_key_header, &descriptor);
            let type_name = format!("{}_{}", config.provider_name, descriptor.name);

            debug!(
                "Registered {} -> {} ({} properties)",
                type_name,
                endpoint.collection_url(),
                synthesis.schema.properties.len()
            );

            let lifecycle = ResourceLifecycle::new(
                Arc::new(synthesis.schema),
                Arc::new(endpoint),
                client.clone(),
            );
            resources.insert(
                type_name.clone(),
                RegisteredResource {
                    type_name,
                    description: descriptor.description().map(str::to_string),
                    lifecycle,
                    warnings: synthesis.warnings,
                },
            );
        }

        info!(
            "Assembled provider '{}' with {} resource types against {}",
            config.provider_name,
            resources.len(),
            base_url
        );

        Ok(Self {
            name: config.provider_name.clone(),
            resources,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered type names, sorted
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn resources(&self) -> impl Iterator<Item = &RegisteredResource> {
        self.resources.values()
    }

    /// Look up a registered resource type
    pub fn resource(&self, type_name: &str) -> Result<&RegisteredResource> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Lifecycle of a registered resource type
    pub fn lifecycle(&self, type_name: &str) -> Result<&ResourceLifecycle> {
        self.resource(type_name).map(|r| &r.lifecycle)
    }

    pub fn resource_schema(&self, type_name: &str) -> Result<&ResourceSchema> {
        self.lifecycle(type_name).map(|l| l.schema())
    }
}

fn endpoint_for(
    config: &ProviderConfig,
    base_url: &str,
    api_key_header: &str,
    descriptor: &ResourceDescriptor,
) -> HttpEndpointConfig {
    let mut endpoint = HttpEndpointConfig::new(base_url, descriptor.root_path.as_str())
        .with_api_key(api_key_header, config.api_key.clone());

    for (name, value) in &config.headers {
        endpoint = endpoint.with_header(name.as_str(), value.as_str());
    }

    for header in descriptor.headers.iter().filter(|h| h.required) {
        let configured = config
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(&header.name));
        if !configured {
            warn!(
                "{} requires header '{}' but no value is configured",
                descriptor.name, header.name
            );
        }
    }

    endpoint
}
