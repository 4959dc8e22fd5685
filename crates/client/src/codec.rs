//! Translation between resource instances and wire JSON
//!
//! Instances are keyed by host-facing property names; request and response
//! bodies use the API names. Both directions walk the schema tree, so nested
//! objects and lists of objects are renamed and type-checked recursively.

use openapi_provider_common::{
    PropertyKind, PropertySchema, ProviderError, ResourceInstance, ResourceSchema, Result,
};
use serde_json::{Map, Number, Value};

/// Which request a body is being encoded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every non-computed property
    Create,
    /// Every non-computed, non-immutable top-level property
    ///
    /// Nested objects are sent whole, immutable fields included, since the
    /// API replaces them as a unit. Changes to those fields are rejected
    /// before an update is encoded.
    Update,
}

impl EncodeMode {
    fn includes(&self, property: &PropertySchema) -> bool {
        match self {
            EncodeMode::Create => property.is_creatable(),
            EncodeMode::Update => property.is_updatable(),
        }
    }
}

/// Encode an instance as a request body
pub fn encode(
    schema: &ResourceSchema,
    instance: &ResourceInstance,
    mode: EncodeMode,
) -> Result<Value> {
    let mut body = Map::new();
    for property in schema.properties.iter().filter(|p| mode.includes(p)) {
        if let Some(value) = instance.get(&property.name) {
            let encoded = encode_value(&property.kind, value, &property.name)?;
            body.insert(property.api_name.clone(), encoded);
        }
    }
    Ok(Value::Object(body))
}

fn encode_value(kind: &PropertyKind, value: &Value, path: &str) -> Result<Value> {
    let mismatch = || {
        ProviderError::InvalidInstance(format!(
            "{}: expected {}, got {}",
            path,
            kind.type_name(),
            json_type(value)
        ))
    };

    match kind {
        PropertyKind::Object(properties) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            let mut encoded = Map::new();
            for property in properties.iter().filter(|p| p.is_creatable()) {
                if let Some(nested) = object.get(&property.name).filter(|v| !v.is_null()) {
                    let nested_path = format!("{}.{}", path, property.name);
                    encoded.insert(
                        property.api_name.clone(),
                        encode_value(&property.kind, nested, &nested_path)?,
                    );
                }
            }
            Ok(Value::Object(encoded))
        }
        PropertyKind::List(element) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_value(element, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        PropertyKind::Map(element) => {
            let entries = value.as_object().ok_or_else(mismatch)?;
            let mut encoded = Map::new();
            for (key, item) in entries {
                let item_path = format!("{}.{}", path, key);
                encoded.insert(key.clone(), encode_value(element, item, &item_path)?);
            }
            Ok(Value::Object(encoded))
        }
        primitive => coerce_primitive(primitive, value).ok_or_else(mismatch),
    }
}

/// Decode a response body into an observed instance
///
/// Fields the schema does not declare are ignored.
pub fn decode(schema: &ResourceSchema, body: &Value) -> Result<ResourceInstance> {
    let object = body.as_object().ok_or_else(|| {
        ProviderError::InvalidResponse(format!(
            "{}: expected a JSON object, got {}",
            schema.resource_name,
            json_type(body)
        ))
    })?;

    Ok(ResourceInstance::from(decode_properties(
        &schema.properties,
        object,
        &schema.resource_name,
    )?))
}

fn decode_properties(
    properties: &[PropertySchema],
    object: &Map<String, Value>,
    path: &str,
) -> Result<Map<String, Value>> {
    let mut decoded = Map::new();
    for property in properties {
        if let Some(value) = object.get(&property.api_name).filter(|v| !v.is_null()) {
            let property_path = format!("{}.{}", path, property.api_name);
            decoded.insert(
                property.name.clone(),
                decode_value(&property.kind, value, &property_path)?,
            );
        }
    }
    Ok(decoded)
}

fn decode_value(kind: &PropertyKind, value: &Value, path: &str) -> Result<Value> {
    let mismatch = || {
        ProviderError::InvalidResponse(format!(
            "{}: expected {}, got {}",
            path,
            kind.type_name(),
            json_type(value)
        ))
    };

    match kind {
        PropertyKind::Object(properties) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            decode_properties(properties, object, path).map(Value::Object)
        }
        PropertyKind::List(element) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_value(element, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        PropertyKind::Map(element) => {
            let entries = value.as_object().ok_or_else(mismatch)?;
            let mut decoded = Map::new();
            for (key, item) in entries {
                decoded.insert(
                    key.clone(),
                    decode_value(element, item, &format!("{}.{}", path, key))?,
                );
            }
            Ok(Value::Object(decoded))
        }
        // servers commonly return numeric identifiers for string fields
        PropertyKind::String if value.is_number() => Ok(Value::String(value.to_string())),
        primitive => coerce_primitive(primitive, value).ok_or_else(mismatch),
    }
}

/// Check a scalar against its kind, normalising whole floats to integers
fn coerce_primitive(kind: &PropertyKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (PropertyKind::String, Value::String(_))
        | (PropertyKind::Boolean, Value::Bool(_))
        | (PropertyKind::Number, Value::Number(_)) => Some(value.clone()),
        (PropertyKind::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::Number(Number::from(f as i64)))
            }
        }
        _ => None,
    }
}

/// Check a desired instance against the schema before any request is made
///
/// Rejects unknown properties, missing required properties, and values of
/// the wrong type. Values for computed properties are tolerated and ignored.
pub fn validate(schema: &ResourceSchema, instance: &ResourceInstance) -> Result<()> {
    if let Some(unknown) = instance.names().find(|name| schema.property(name).is_none()) {
        return Err(ProviderError::InvalidInstance(format!(
            "{} has no property '{}'",
            schema.resource_name, unknown
        )));
    }

    let missing: Vec<&str> = schema
        .required_properties()
        .filter(|p| !instance.contains(&p.name) && p.default.is_none())
        .map(|p| p.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ProviderError::InvalidInstance(format!(
            "{} is missing required properties: {}",
            schema.resource_name,
            missing.join(", ")
        )));
    }

    encode(schema, instance, EncodeMode::Create).map(|_| ())
}

/// Fill in schema defaults for absent, non-computed properties
pub fn apply_defaults(schema: &ResourceSchema, instance: &ResourceInstance) -> ResourceInstance {
    let mut filled = instance.clone();
    for property in &schema.properties {
        if let (Some(default), false) = (&property.default, property.computed) {
            if !filled.contains(&property.name) {
                filled.set(property.name.clone(), default.clone());
            }
        }
    }
    filled
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
