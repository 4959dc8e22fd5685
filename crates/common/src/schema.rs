//! Generic resource schema
//!
//! A [`ResourceSchema`] is synthesized once per resource type from the
//! OpenAPI document and then interpreted generically by the HTTP client and
//! the lifecycle engine. No per-resource code exists.

use serde::{Deserialize, Serialize};

/// Semantic type of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Ordered list of elements of one kind
    List(Box<PropertyKind>),
    /// Nested object with its own properties
    Object(Vec<PropertySchema>),
    /// String-keyed map of values of one kind
    Map(Box<PropertyKind>),
}

impl PropertyKind {
    /// Short type name used in schema descriptions
    pub fn type_name(&self) -> String {
        match self {
            PropertyKind::String => "string".to_string(),
            PropertyKind::Integer => "integer".to_string(),
            PropertyKind::Number => "number".to_string(),
            PropertyKind::Boolean => "bool".to_string(),
            PropertyKind::List(element) => format!("list({})", element.type_name()),
            PropertyKind::Object(_) => "object".to_string(),
            PropertyKind::Map(value) => format!("map({})", value.type_name()),
        }
    }

    /// Whether values of this kind are JSON scalars
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            PropertyKind::String
                | PropertyKind::Integer
                | PropertyKind::Number
                | PropertyKind::Boolean
        )
    }
}

/// One field of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Host-facing name (snake_case, unique within its parent)
    pub name: String,

    /// Name used in request and response bodies
    pub api_name: String,

    pub kind: PropertyKind,

    /// Must be supplied by the caller at create time
    #[serde(default)]
    pub required: bool,

    /// Assigned by the server; never sent in requests
    #[serde(default)]
    pub computed: bool,

    /// Settable only at create time
    #[serde(default)]
    pub immutable: bool,

    /// A change destroys and recreates the resource
    #[serde(default)]
    pub force_new: bool,

    /// Value should be hidden from displays
    #[serde(default)]
    pub sensitive: bool,

    /// This property identifies the resource instance
    #[serde(default)]
    pub identifier: bool,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub description: Option<String>,
}

impl PropertySchema {
    /// Create an optional, caller-managed property
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        let name = name.into();
        Self {
            api_name: name.clone(),
            name,
            kind,
            required: false,
            computed: false,
            immutable: false,
            force_new: false,
            sensitive: false,
            identifier: false,
            default: None,
            description: None,
        }
    }

    /// Create the server-assigned identifier property
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            computed: true,
            identifier: true,
            ..Self::new(name, PropertyKind::String)
        }
    }

    pub fn with_api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Nested properties, for object kinds and lists of objects
    pub fn nested(&self) -> Option<&[PropertySchema]> {
        match &self.kind {
            PropertyKind::Object(properties) => Some(properties),
            PropertyKind::List(element) => match element.as_ref() {
                PropertyKind::Object(properties) => Some(properties),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether the caller may send this property in a create request
    pub fn is_creatable(&self) -> bool {
        !self.computed
    }

    /// Whether the caller may send this property in an update request
    pub fn is_updatable(&self) -> bool {
        !self.computed && !self.immutable
    }
}

/// Ordered set of properties describing one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Resource name as discovered from the document (e.g. "cdns")
    pub resource_name: String,

    pub properties: Vec<PropertySchema>,
}

impl ResourceSchema {
    pub fn new(resource_name: impl Into<String>, properties: Vec<PropertySchema>) -> Self {
        Self {
            resource_name: resource_name.into(),
            properties,
        }
    }

    /// Look up a top-level property by its host-facing name
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The identifier property, if the schema declares one
    pub fn identifier(&self) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.identifier)
    }

    /// Host-facing name of the identifier property, "id" when undeclared
    pub fn identifier_name(&self) -> &str {
        self.identifier().map(|p| p.name.as_str()).unwrap_or("id")
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties.iter().filter(|p| p.required)
    }

    pub fn force_new_properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties.iter().filter(|p| p.force_new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn_schema() -> ResourceSchema {
        ResourceSchema::new(
            "cdns",
            vec![
                PropertySchema::identifier("id"),
                PropertySchema::new("label", PropertyKind::String)
                    .required()
                    .immutable(),
                PropertySchema::new("ips", PropertyKind::List(Box::new(PropertyKind::String)))
                    .force_new(),
                PropertySchema::new(
                    "hostnames",
                    PropertyKind::List(Box::new(PropertyKind::String)),
                ),
            ],
        )
    }

    #[test]
    fn test_identifier_lookup() {
        let schema = cdn_schema();
        let id = schema.identifier().unwrap();
        assert_eq!(id.name, "id");
        assert!(id.computed);
        assert_eq!(schema.identifier_name(), "id");
    }

    #[test]
    fn test_flag_queries() {
        let schema = cdn_schema();
        let required: Vec<_> = schema.required_properties().map(|p| &p.name).collect();
        assert_eq!(required, vec!["label"]);

        let force_new: Vec<_> = schema.force_new_properties().map(|p| &p.name).collect();
        assert_eq!(force_new, vec!["ips"]);

        let label = schema.property("label").unwrap();
        assert!(label.is_creatable());
        assert!(!label.is_updatable());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            PropertyKind::List(Box::new(PropertyKind::Integer)).type_name(),
            "list(integer)"
        );
        assert_eq!(
            PropertyKind::Map(Box::new(PropertyKind::Boolean)).type_name(),
            "map(bool)"
        );
        assert!(PropertyKind::Number.is_primitive());
        assert!(!PropertyKind::Object(vec![]).is_primitive());
    }

    #[test]
    fn test_nested_properties() {
        let origin = PropertySchema::new(
            "origins",
            PropertyKind::List(Box::new(PropertyKind::Object(vec![PropertySchema::new(
                "host",
                PropertyKind::String,
            )]))),
        );
        assert_eq!(origin.nested().unwrap().len(), 1);
        assert!(PropertySchema::new("x", PropertyKind::String)
            .nested()
            .is_none());
    }
}
