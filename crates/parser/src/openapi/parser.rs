//! OpenAPI document loader

use super::analyser::{ResourceDescriptor, SpecAnalyser};
use super::types::{OpenApiDocument, SpecVersion};
use openapi_provider_common::{ProviderError, Result, SpecSource};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// OpenAPI document parser
///
/// Loads Swagger 2.0 and OpenAPI 3.x documents, in JSON or YAML, from a
/// string, a local file, or an HTTP(S) URL.
pub struct OpenApiParser {
    /// Loaded document
    document: OpenApiDocument,

    /// Where the document came from, for diagnostics
    source: String,
}

impl OpenApiParser {
    /// Load a document from wherever `source` points
    pub fn load(source: &SpecSource, timeout: Duration) -> Result<Self> {
        match source {
            SpecSource::Url(url) => Self::from_url(url, timeout),
            SpecSource::File(path) => Self::from_file(path),
        }
    }

    /// Load a document from a file path
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = OpenApiParser::from_file("swagger.json")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ProviderError::SpecRetrieval {
            source_url: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let parser = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_str(&content)?
        };

        Ok(parser.with_source(path.display().to_string()))
    }

    /// Fetch a document over HTTP(S)
    pub fn from_url(url: &str, timeout: Duration) -> Result<Self> {
        info!("Fetching OpenAPI document from {}", url);

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let retrieval_error = |message: String| ProviderError::SpecRetrieval {
            source_url: url.to_string(),
            message,
        };

        let mut response = agent
            .get(url)
            .header("Accept", "application/json, application/yaml")
            .call()
            .map_err(|e| retrieval_error(e.to_string()))?;

        let content = response
            .body_mut()
            .read_to_string()
            .map_err(|e| retrieval_error(e.to_string()))?;

        Ok(Self::from_str(&content)?.with_source(url))
    }

    /// Parse a document, detecting JSON or YAML from its first character
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        if content.trim_start().starts_with('{') {
            Self::from_json(content)
        } else {
            Self::from_yaml(content)
        }
    }

    /// Parse a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_json::from_str(json)
            .map_err(|e| ProviderError::SpecParse(format!("Failed to parse OpenAPI JSON: {}", e)))?;
        Self::from_document(document)
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_yaml::from_str(yaml)
            .map_err(|e| ProviderError::SpecParse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Self::from_document(document)
    }

    /// Wrap an already decoded document
    pub fn from_document(document: OpenApiDocument) -> Result<Self> {
        let version = document.version().ok_or_else(|| {
            ProviderError::SpecParse(
                "Document declares neither 'swagger: 2.x' nor 'openapi: 3.x'".to_string(),
            )
        })?;
        debug!(
            "Loaded {:?} document '{}' with {} paths",
            version,
            document.info.title,
            document.paths.len()
        );

        Ok(Self {
            document,
            source: "<inline>".to_string(),
        })
    }

    fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Discover the CRUD-compliant resources in the document
    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        SpecAnalyser::new(&self.document).resources()
    }

    pub fn version(&self) -> SpecVersion {
        // from_document guarantees a recognised version
        self.document.version().unwrap_or(SpecVersion::V3)
    }

    /// Get reference to the underlying document
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_openapi() {
        let openapi_json = r#"{
            "openapi": "3.0.0",
            "info": {
                "title": "Test API",
                "version": "1.0.0"
            },
            "paths": {}
        }"#;

        let parser = OpenApiParser::from_json(openapi_json).unwrap();
        assert_eq!(parser.version(), SpecVersion::V3);
        assert_eq!(parser.document().info.title, "Test API");
        assert_eq!(parser.source(), "<inline>");
    }

    #[test]
    fn test_parse_yaml_swagger() {
        let yaml = "swagger: '2.0'\ninfo:\n  title: CDN\n  version: '1'\npaths: {}\n";
        let parser = OpenApiParser::from_str(yaml).unwrap();
        assert_eq!(parser.version(), SpecVersion::V2);
    }

    #[test]
    fn test_malformed_document() {
        let result = OpenApiParser::from_json("{\"openapi\": ");
        assert!(matches!(result, Err(ProviderError::SpecParse(_))));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let result = OpenApiParser::from_json(r#"{"info": {"title": "x", "version": "1"}}"#);
        assert!(matches!(result, Err(ProviderError::SpecParse(_))));
    }

    #[test]
    fn test_missing_file_is_retrieval_error() {
        let result = OpenApiParser::from_file("/definitely/not/here/swagger.json");
        assert!(matches!(result, Err(ProviderError::SpecRetrieval { .. })));
    }

    #[test]
    fn test_from_file_records_source() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "openapi: 3.0.0\npaths: {{}}").unwrap();

        let parser = OpenApiParser::from_file(file.path()).unwrap();
        assert_eq!(parser.source(), file.path().display().to_string());
    }

    #[test]
    fn test_unreachable_url_is_retrieval_error() {
        let result = OpenApiParser::from_url(
            "http://127.0.0.1:1/swagger.json",
            Duration::from_secs(2),
        );
        assert!(matches!(result, Err(ProviderError::SpecRetrieval { .. })));
    }
}
