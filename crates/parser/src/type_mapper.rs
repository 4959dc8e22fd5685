//! Type mapping from OpenAPI types to the generic schema
//!
//! Maps OpenAPI primitive `type`/`format` pairs to `PropertyKind`.

use openapi_provider_common::PropertyKind;

/// Maps OpenAPI type names to PropertyKind
pub struct TypeMapper;

impl TypeMapper {
    /// Map a primitive OpenAPI type to PropertyKind
    ///
    /// Returns `None` for `array`, `object`, and unknown types, which need
    /// structural handling.
    ///
    /// # Examples
    /// ```
    /// use openapi_provider_parser::TypeMapper;
    /// use openapi_provider_common::PropertyKind;
    ///
    /// assert_eq!(TypeMapper::map_primitive("string", None), Some(PropertyKind::String));
    /// assert_eq!(TypeMapper::map_primitive("integer", Some("int64")), Some(PropertyKind::Integer));
    /// assert_eq!(TypeMapper::map_primitive("array", None), None);
    /// ```
    pub fn map_primitive(schema_type: &str, format: Option<&str>) -> Option<PropertyKind> {
        match schema_type {
            "string" => Some(PropertyKind::String),
            "integer" => Some(PropertyKind::Integer),
            // float/double are plain numbers; int formats on "number" are integers
            "number" => match format {
                Some("int32") | Some("int64") => Some(PropertyKind::Integer),
                _ => Some(PropertyKind::Number),
            },
            "boolean" => Some(PropertyKind::Boolean),
            _ => None,
        }
    }

    /// Check if a format marks the value as secret
    pub fn is_sensitive_format(format: Option<&str>) -> bool {
        matches!(format, Some("password"))
    }
}
