//! Converts OpenAPI schema definitions into generic resource schemas
//!
//! Unsupported constructs are skipped with a [`SynthesisWarning`]; only an
//! unresolvable top-level body schema is an error.

use super::analyser::ResourceDescriptor;
use super::types::{AdditionalProperties, OpenApiDocument, Schema, SchemaOrRef};
use crate::type_mapper::TypeMapper;
use openapi_provider_common::{
    to_snake_case, PropertyKind, PropertySchema, ProviderError, ResourceSchema, Result,
};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

pub const IMMUTABLE_EXTENSION: &str = "x-terraform-immutable";
pub const FORCE_NEW_EXTENSION: &str = "x-terraform-force-new";
pub const SENSITIVE_EXTENSION: &str = "x-terraform-sensitive";
pub const COMPUTED_EXTENSION: &str = "x-terraform-computed";
pub const ID_EXTENSION: &str = "x-terraform-id";
pub const FIELD_NAME_EXTENSION: &str = "x-terraform-field-name";

/// A schema construct that could not be represented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisWarning {
    /// Dotted location of the construct, e.g. "cdns.origins.weight"
    pub path: String,
    pub message: String,
}

impl fmt::Display for SynthesisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result of synthesizing one resource
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub schema: ResourceSchema,
    pub warnings: Vec<SynthesisWarning>,
}

/// Mutable state threaded through one synthesis run
#[derive(Default)]
struct Context {
    warnings: Vec<SynthesisWarning>,
    /// References currently being expanded, for cycle detection
    expanding: Vec<String>,
}

impl Context {
    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(SynthesisWarning {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Builds ResourceSchemas from a document's schema definitions
pub struct SchemaSynthesizer<'a> {
    document: &'a OpenApiDocument,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(document: &'a OpenApiDocument) -> Self {
        Self { document }
    }

    /// Synthesize the schema of a discovered resource
    pub fn synthesize_descriptor(&self, descriptor: &ResourceDescriptor) -> Result<Synthesis> {
        self.synthesize(&descriptor.name, &descriptor.body_schema)
    }

    /// Synthesize a resource schema from its body schema
    pub fn synthesize(&self, resource_name: &str, body: &SchemaOrRef) -> Result<Synthesis> {
        let mut ctx = Context::default();

        let root_ref = body.ref_path().map(str::to_string);
        let schema = self.resolve(body).ok_or_else(|| {
            ProviderError::SpecParse(format!(
                "Body schema {} of resource '{}' cannot be resolved",
                root_ref.as_deref().unwrap_or("<inline>"),
                resource_name
            ))
        })?;

        if let Some(name) = &root_ref {
            ctx.expanding.push(name.clone());
        }
        let mut properties = self.object_properties(schema, resource_name, &mut ctx);
        assign_identifier(&mut properties, resource_name, &mut ctx);

        for warning in &ctx.warnings {
            warn!("Schema synthesis: {}", warning);
        }

        Ok(Synthesis {
            schema: ResourceSchema::new(resource_name, properties),
            warnings: ctx.warnings,
        })
    }

    /// Resolve a schema or reference to a concrete schema
    fn resolve<'s>(&'s self, schema_or_ref: &'s SchemaOrRef) -> Option<&'s Schema> {
        match schema_or_ref {
            SchemaOrRef::Reference { ref_path } => self.document.resolve_schema_ref(ref_path),
            SchemaOrRef::Schema(schema) => match &schema.ref_path {
                Some(ref_path) => self.document.resolve_schema_ref(ref_path),
                None => Some(schema.as_ref()),
            },
        }
    }

    /// Resolve, guard against cycles, and run `f` on the resolved schema
    fn expand<T>(
        &self,
        schema_or_ref: &SchemaOrRef,
        path: &str,
        ctx: &mut Context,
        f: impl FnOnce(&Self, &Schema, &mut Context) -> Option<T>,
    ) -> Option<T> {
        let ref_path = schema_or_ref.ref_path().map(str::to_string);

        if let Some(name) = &ref_path {
            if ctx.expanding.contains(name) {
                ctx.warn(path, format!("cyclic reference {} skipped", name));
                return None;
            }
        }

        let Some(schema) = self.resolve(schema_or_ref) else {
            ctx.warn(
                path,
                format!(
                    "unresolvable reference {}",
                    ref_path.as_deref().unwrap_or("<inline>")
                ),
            );
            return None;
        };

        if let Some(name) = &ref_path {
            ctx.expanding.push(name.clone());
        }
        let result = f(self, schema, ctx);
        if ref_path.is_some() {
            ctx.expanding.pop();
        }
        result
    }

    /// Properties of an object schema, including allOf members, in order
    fn object_properties(
        &self,
        schema: &Schema,
        path: &str,
        ctx: &mut Context,
    ) -> Vec<PropertySchema> {
        let mut properties: Vec<PropertySchema> = Vec::new();

        for member in &schema.all_of {
            let inherited = self
                .expand(member, path, ctx, |this, resolved, ctx| {
                    Some(this.object_properties(resolved, path, ctx))
                })
                .unwrap_or_default();
            for property in inherited {
                push_unique(&mut properties, property, path, ctx);
            }
        }

        let required: HashSet<&str> = schema.required.iter().map(String::as_str).collect();

        for (api_name, property_ref) in schema.properties.iter() {
            let property_path = format!("{}.{}", path, api_name);
            let property = self.expand(property_ref, &property_path, ctx, |this, resolved, ctx| {
                this.property(api_name, resolved, required.contains(api_name.as_str()), &property_path, ctx)
            });
            if let Some(property) = property {
                push_unique(&mut properties, property, path, ctx);
            }
        }

        properties
    }

    fn property(
        &self,
        api_name: &str,
        schema: &Schema,
        required: bool,
        path: &str,
        ctx: &mut Context,
    ) -> Option<PropertySchema> {
        let kind = self.kind_of(schema, path, ctx)?;

        let name = schema
            .extension_str(FIELD_NAME_EXTENSION)
            .map(to_snake_case)
            .unwrap_or_else(|| to_snake_case(api_name));

        let computed = schema.read_only || schema.extension_bool(COMPUTED_EXTENSION);
        if required && computed {
            ctx.warn(path, "property is both required and read-only; treated as computed");
        }

        Some(PropertySchema {
            name,
            api_name: api_name.to_string(),
            kind,
            required: required && !computed,
            computed,
            immutable: schema.extension_bool(IMMUTABLE_EXTENSION),
            force_new: schema.extension_bool(FORCE_NEW_EXTENSION),
            sensitive: schema.extension_bool(SENSITIVE_EXTENSION)
                || TypeMapper::is_sensitive_format(schema.format.as_deref()),
            identifier: schema.extension_bool(ID_EXTENSION),
            default: schema.default.clone(),
            description: schema.description.clone(),
        })
    }

    /// Map a resolved schema to a PropertyKind
    fn kind_of(&self, schema: &Schema, path: &str, ctx: &mut Context) -> Option<PropertyKind> {
        let schema_type = schema.primary_type();

        if let Some(kind) =
            schema_type.and_then(|t| TypeMapper::map_primitive(t, schema.format.as_deref()))
        {
            return Some(kind);
        }

        match schema_type {
            Some("array") => {
                let Some(items) = &schema.items else {
                    ctx.warn(path, "array without items skipped");
                    return None;
                };
                self.expand(items, path, ctx, |this, resolved, ctx| {
                    this.kind_of(resolved, path, ctx)
                })
                .map(|element| PropertyKind::List(Box::new(element)))
            }
            Some("object") | None if schema.has_object_shape() => {
                let nested = self.object_properties(schema, path, ctx);
                if nested.is_empty() {
                    ctx.warn(path, "object without usable properties skipped");
                    return None;
                }
                Some(PropertyKind::Object(nested))
            }
            Some("object") => match &schema.additional_properties {
                Some(AdditionalProperties::Schema(values)) => self
                    .expand(values, path, ctx, |this, resolved, ctx| {
                        this.kind_of(resolved, path, ctx)
                    })
                    .map(|value| PropertyKind::Map(Box::new(value))),
                _ => {
                    ctx.warn(path, "free-form object skipped");
                    None
                }
            },
            Some(other) => {
                ctx.warn(path, format!("unsupported type '{}' skipped", other));
                None
            }
            None if !schema.one_of.is_empty() || !schema.any_of.is_empty() => {
                ctx.warn(path, "oneOf/anyOf composition skipped");
                None
            }
            None => {
                ctx.warn(path, "schema without type skipped");
                None
            }
        }
    }
}

/// Append a property unless its host-facing name is already taken
fn push_unique(
    properties: &mut Vec<PropertySchema>,
    property: PropertySchema,
    path: &str,
    ctx: &mut Context,
) {
    if properties.iter().any(|p| p.name == property.name) {
        ctx.warn(
            &format!("{}.{}", path, property.api_name),
            format!("duplicate property name '{}' skipped", property.name),
        );
        return;
    }
    properties.push(property);
}

/// Mark exactly one top-level property as the computed identifier
fn assign_identifier(properties: &mut Vec<PropertySchema>, resource_name: &str, ctx: &mut Context) {
    let explicit = properties.iter().position(|p| p.identifier);
    let chosen = explicit.or_else(|| properties.iter().position(|p| p.api_name == "id"));

    for (index, property) in properties.iter_mut().enumerate() {
        if Some(index) == chosen {
            continue;
        }
        if property.identifier {
            ctx.warn(
                &format!("{}.{}", resource_name, property.api_name),
                "additional identifier annotation ignored",
            );
            property.identifier = false;
        }
    }

    match chosen {
        Some(index) => {
            let id = &mut properties[index];
            if !id.kind.is_primitive() {
                ctx.warn(
                    &format!("{}.{}", resource_name, id.api_name),
                    "identifier is not a scalar; treated as string",
                );
                id.kind = PropertyKind::String;
            }
            id.identifier = true;
            id.computed = true;
            id.required = false;
        }
        None => {
            ctx.warn(
                resource_name,
                "no identifier property declared; assuming computed 'id'",
            );
            properties.push(PropertySchema::identifier("id"));
        }
    }
}
