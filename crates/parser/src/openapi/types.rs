//! OpenAPI v2 (Swagger) and v3 type definitions
//!
//! One lenient model covers both versions; only the parts needed for
//! resource discovery and schema synthesis are represented.

use openapi_provider_common::HttpMethod;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Prefix of v2 schema references
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Prefix of v3 schema references
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Major version of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.x
    V3,
}

/// OpenAPI document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// Swagger version ("2.0") for v2 documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,

    /// OpenAPI version (e.g. "3.0.3") for v3 documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,

    #[serde(default)]
    pub info: Info,

    /// v2 host (e.g. "localhost:8080")
    #[serde(default)]
    pub host: Option<String>,

    /// v2 base path (e.g. "/api")
    #[serde(rename = "basePath")]
    #[serde(default)]
    pub base_path: Option<String>,

    /// v2 schemes
    #[serde(default)]
    pub schemes: Vec<String>,

    /// v3 servers
    #[serde(default)]
    pub servers: Vec<Server>,

    /// API paths, sorted for deterministic analysis
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// v2 schema definitions
    #[serde(default)]
    pub definitions: HashMap<String, Schema>,

    /// v2 security definitions
    #[serde(rename = "securityDefinitions")]
    #[serde(default)]
    pub security_definitions: BTreeMap<String, SecurityScheme>,

    /// v3 reusable components
    #[serde(default)]
    pub components: Option<Components>,
}

/// API information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// v3 server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Operations available on one path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,

    #[serde(default)]
    pub post: Option<Operation>,

    #[serde(default)]
    pub put: Option<Operation>,

    #[serde(default)]
    pub patch: Option<Operation>,

    #[serde(default)]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation on the path
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Operation declared for an HTTP method
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
        }
    }

    /// Declared operations in a fixed method order
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ]
        .into_iter()
        .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }
}

/// HTTP operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// v3 request body
    #[serde(rename = "requestBody")]
    #[serde(default)]
    pub request_body: Option<RequestBody>,

    #[serde(default)]
    pub responses: BTreeMap<String, Response>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Vendor extensions (x-terraform-*, etc.)
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl Operation {
    /// Schema of the JSON request body, for either document version
    pub fn body_schema(&self) -> Option<&SchemaOrRef> {
        if let Some(body) = &self.request_body {
            if let Some(schema) = json_media_schema(&body.content) {
                return Some(schema);
            }
        }

        self.parameters
            .iter()
            .find(|p| p.location == "body")
            .and_then(|p| p.schema.as_ref())
    }

    /// Schema of the first successful response among `statuses`
    pub fn response_schema(&self, statuses: &[&str]) -> Option<&SchemaOrRef> {
        statuses
            .iter()
            .filter_map(|status| self.responses.get(*status))
            .find_map(|response| {
                json_media_schema(&response.content).or(response.schema.as_ref())
            })
    }

    /// Parameters sent as request headers
    pub fn header_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.location == "header")
    }

    pub fn extension_bool(&self, name: &str) -> bool {
        extension_bool(&self.extensions, name)
    }

    pub fn extension_str(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).and_then(|v| v.as_str())
    }
}

/// Prefer `application/json`, fall back to the first declared media type
fn json_media_schema(content: &BTreeMap<String, MediaType>) -> Option<&SchemaOrRef> {
    content
        .get("application/json")
        .or_else(|| content.values().next())
        .and_then(|media| media.schema.as_ref())
}

fn extension_bool(extensions: &HashMap<String, serde_json::Value>, name: &str) -> bool {
    match extensions.get(name) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parameter definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,

    /// Location: query, header, path, cookie, body (v2)
    #[serde(rename = "in")]
    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Schema (v3 parameters and v2 body parameters)
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,

    /// Reference to a shared parameter, not followed
    #[serde(rename = "$ref")]
    #[serde(default)]
    pub ref_path: Option<String>,
}

/// v3 request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// Response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,

    /// v3 content types
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,

    /// v2 response schema
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,
}

/// Media type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,
}

/// Schema or reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    /// Reference to a named schema
    Reference {
        #[serde(rename = "$ref")]
        ref_path: String,
    },

    /// Inline schema
    Schema(Box<Schema>),
}

impl SchemaOrRef {
    /// Name of the referenced schema, if this is a reference
    pub fn ref_path(&self) -> Option<&str> {
        match self {
            SchemaOrRef::Reference { ref_path } => Some(ref_path),
            SchemaOrRef::Schema(schema) => schema.ref_path.as_deref(),
        }
    }
}

/// `type` may be a single name or, in OpenAPI 3.1, a list including "null"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// `additionalProperties` is either a flag or a schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaOrRef>),
}

/// Schema definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(rename = "type")]
    #[serde(default)]
    pub schema_type: Option<SchemaType>,

    /// Format (e.g. int32, int64, date-time, password)
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Properties in declaration order
    #[serde(default)]
    pub properties: Properties,

    #[serde(default)]
    pub required: Vec<String>,

    /// Items schema (for array type)
    #[serde(default)]
    pub items: Option<Box<SchemaOrRef>>,

    #[serde(rename = "additionalProperties")]
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(rename = "allOf")]
    #[serde(default)]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf")]
    #[serde(default)]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(rename = "anyOf")]
    #[serde(default)]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(rename = "readOnly")]
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(rename = "enum")]
    #[serde(default)]
    pub enum_values: Vec<serde_json::Value>,

    #[serde(rename = "$ref")]
    #[serde(default)]
    pub ref_path: Option<String>,

    /// Vendor extensions (x-terraform-*, etc.)
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl Schema {
    /// The declared type, ignoring "null" in OpenAPI 3.1 type lists
    pub fn primary_type(&self) -> Option<&str> {
        match self.schema_type.as_ref()? {
            SchemaType::Single(t) => Some(t.as_str()),
            SchemaType::Multiple(types) => types
                .iter()
                .map(String::as_str)
                .find(|t| *t != "null"),
        }
    }

    /// Whether the schema describes an object with named properties
    pub fn has_object_shape(&self) -> bool {
        !self.properties.is_empty() || !self.all_of.is_empty()
    }

    pub fn extension_bool(&self, name: &str) -> bool {
        extension_bool(&self.extensions, name)
    }

    pub fn extension_str(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).and_then(|v| v.as_str())
    }
}

/// Object properties in the order the document declares them
#[derive(Debug, Clone, Default)]
pub struct Properties(Vec<(String, SchemaOrRef)>);

impl Properties {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaOrRef)> {
        self.0.iter().map(|(name, schema)| (name, schema))
    }

    pub fn get(&self, name: &str) -> Option<&SchemaOrRef> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of property schemas")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut properties = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, schema)) = map.next_entry::<String, SchemaOrRef>()? {
                    properties.push((name, schema));
                }
                Ok(Properties(properties))
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

impl Serialize for Properties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

/// Security scheme (v2 securityDefinitions / v3 securitySchemes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// apiKey, http, oauth2, basic, ...
    #[serde(rename = "type")]
    pub scheme_type: String,

    /// Header/query name for apiKey schemes
    #[serde(default)]
    pub name: Option<String>,

    /// header, query, cookie
    #[serde(rename = "in")]
    #[serde(default)]
    pub location: Option<String>,
}

/// v3 reusable components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: HashMap<String, Schema>,

    #[serde(rename = "securitySchemes")]
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

impl OpenApiDocument {
    /// Major version declared by the document
    pub fn version(&self) -> Option<SpecVersion> {
        if self
            .swagger
            .as_deref()
            .is_some_and(|v| v.starts_with("2."))
        {
            return Some(SpecVersion::V2);
        }
        if self
            .openapi
            .as_deref()
            .is_some_and(|v| v.starts_with("3."))
        {
            return Some(SpecVersion::V3);
        }
        None
    }

    /// Get a schema by reference path
    ///
    /// Handles both "#/definitions/Cdn" (v2) and "#/components/schemas/Cdn" (v3).
    pub fn resolve_schema_ref(&self, ref_path: &str) -> Option<&Schema> {
        if let Some(name) = ref_path.strip_prefix(DEFINITIONS_PREFIX) {
            return self.definitions.get(name);
        }

        let name = ref_path.strip_prefix(COMPONENTS_PREFIX)?;
        self.components.as_ref().and_then(|c| c.schemas.get(name))
    }

    /// Base URL of the described API
    ///
    /// v3 uses the first server; v2 combines the first scheme (default
    /// https), host, and base path.
    pub fn base_url(&self) -> Option<String> {
        if let Some(server) = self.servers.first() {
            return Some(server.url.trim_end_matches('/').to_string());
        }

        let host = self.host.as_deref().filter(|h| !h.is_empty())?;
        let scheme = self
            .schemes
            .first()
            .map(String::as_str)
            .unwrap_or("https");
        let base_path = self
            .base_path
            .as_deref()
            .unwrap_or("")
            .trim_end_matches('/');

        Some(format!("{}://{}{}", scheme, host, base_path))
    }

    /// Header carrying the API key, from the first header apiKey scheme
    pub fn api_key_header(&self) -> Option<&str> {
        let v3_schemes = self
            .components
            .as_ref()
            .map(|c| c.security_schemes.values())
            .into_iter()
            .flatten();

        self.security_definitions
            .values()
            .chain(v3_schemes)
            .find(|s| s.scheme_type == "apiKey" && s.location.as_deref() == Some("header"))
            .and_then(|s| s.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_keep_declaration_order() {
        let schema: Schema = serde_json::from_str(
            r##"{
                "type": "object",
                "properties": {
                    "zeta": {"type": "string"},
                    "alpha": {"type": "string"},
                    "mid": {"$ref": "#/definitions/Mid"}
                }
            }"##,
        )
        .unwrap();

        let names: Vec<_> = schema.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            schema.properties.get("mid").unwrap().ref_path(),
            Some("#/definitions/Mid")
        );
    }

    #[test]
    fn test_type_list_ignores_null() {
        let schema: Schema =
            serde_json::from_str(r#"{"type": ["null", "integer"]}"#).unwrap();
        assert_eq!(schema.primary_type(), Some("integer"));
    }

    #[test]
    fn test_extensions_captured() {
        let schema: Schema = serde_json::from_str(
            r#"{"type": "string", "x-terraform-force-new": true, "x-terraform-field-name": "name"}"#,
        )
        .unwrap();
        assert!(schema.extension_bool("x-terraform-force-new"));
        assert!(!schema.extension_bool("x-terraform-immutable"));
        assert_eq!(schema.extension_str("x-terraform-field-name"), Some("name"));
    }

    #[test]
    fn test_additional_properties_flag_or_schema() {
        let flag: Schema =
            serde_json::from_str(r#"{"type": "object", "additionalProperties": true}"#).unwrap();
        assert!(matches!(
            flag.additional_properties,
            Some(AdditionalProperties::Allowed(true))
        ));

        let map: Schema = serde_json::from_str(
            r#"{"type": "object", "additionalProperties": {"type": "string"}}"#,
        )
        .unwrap();
        assert!(matches!(
            map.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
    }

    #[test]
    fn test_v2_base_url() {
        let doc: OpenApiDocument = serde_json::from_str(
            r#"{"swagger": "2.0", "host": "localhost:8080", "basePath": "/api/", "schemes": ["http"]}"#,
        )
        .unwrap();
        assert_eq!(doc.version(), Some(SpecVersion::V2));
        assert_eq!(doc.base_url().as_deref(), Some("http://localhost:8080/api"));
    }

    #[test]
    fn test_v3_base_url_and_api_key_header() {
        let doc: OpenApiDocument = serde_json::from_str(
            r#"{
                "openapi": "3.0.1",
                "servers": [{"url": "https://api.example.com/"}],
                "components": {
                    "securitySchemes": {
                        "apikey": {"type": "apiKey", "in": "header", "name": "X-API-Key"}
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(doc.version(), Some(SpecVersion::V3));
        assert_eq!(doc.base_url().as_deref(), Some("https://api.example.com"));
        assert_eq!(doc.api_key_header(), Some("X-API-Key"));
    }
}
