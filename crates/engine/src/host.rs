//! Host-facing provider contract
//!
//! Hosts exchange resource state as JSON objects keyed by host-facing
//! property names. Every call names the registered resource type it targets.

use crate::assembly::Provider;
use crate::lifecycle::{self, ManagedInstance, PropertyChange, ResourceLifecycle};
use openapi_provider_common::{
    PropertySchema, ProviderError, ResourceInstance, ResourceSchema, Result,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Outcome of planning a change to one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub changes: Vec<PropertyChange>,

    /// Applying the plan destroys and recreates the resource
    pub requires_replace: bool,
}

impl PlanResult {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Operations a host drives a provider through
pub trait ResourceProvider: Send + Sync {
    /// Property metadata of every resource type
    fn schema(&self) -> Value;

    /// Compare proposed state against prior state without touching the remote API
    ///
    /// Only force-new changes call for replacement. Changes to immutable
    /// properties fail with `ImmutablePropertyChanged`, as `update` does,
    /// unless a force-new change already replaces the resource.
    fn plan(&self, resource_type: &str, prior: Option<Value>, proposed: Value) -> Result<PlanResult>;

    fn create(&self, resource_type: &str, planned: Value) -> Result<Value>;

    /// Refresh state; `None` when the resource no longer exists
    fn read(&self, resource_type: &str, state: Value) -> Result<Option<Value>>;

    fn update(&self, resource_type: &str, prior: Value, planned: Value) -> Result<Value>;

    fn delete(&self, resource_type: &str, state: Value) -> Result<()>;

    /// Adopt an existing remote resource
    fn import(&self, resource_type: &str, id: &str) -> Result<Value>;
}

impl ResourceProvider for Provider {
    fn schema(&self) -> Value {
        let resources: Map<String, Value> = self
            .resources()
            .map(|resource| {
                let schema = resource.lifecycle.schema();
                let described = json!({
                    "description": resource.description,
                    "identifier": schema.identifier_name(),
                    "properties": describe_properties(&schema.properties),
                });
                (resource.type_name.clone(), described)
            })
            .collect();

        json!({
            "provider": self.name(),
            "resources": resources,
        })
    }

    fn plan(&self, resource_type: &str, prior: Option<Value>, proposed: Value) -> Result<PlanResult> {
        let lifecycle = self.lifecycle(resource_type)?;
        let proposed = instance_from(proposed)?;
        let prior = prior.map(instance_from).transpose()?.unwrap_or_default();

        let changes = lifecycle::diff(lifecycle.schema(), &prior, &proposed);
        if prior.is_empty() {
            return Ok(PlanResult {
                changes,
                requires_replace: false,
            });
        }

        let requires_replace = changes.iter().any(|c| c.requires_replacement);
        let immutable: Vec<String> = changes
            .iter()
            .filter(|c| c.immutable)
            .map(|c| c.property.clone())
            .collect();
        if !requires_replace && !immutable.is_empty() {
            return Err(ProviderError::ImmutablePropertyChanged {
                properties: immutable,
            });
        }
        Ok(PlanResult {
            changes,
            requires_replace,
        })
    }

    fn create(&self, resource_type: &str, planned: Value) -> Result<Value> {
        let lifecycle = self.lifecycle(resource_type)?;
        let mut instance = ManagedInstance::absent();
        lifecycle.create(&mut instance, &instance_from(planned)?)?;
        Ok(instance.observed().to_value())
    }

    fn read(&self, resource_type: &str, state: Value) -> Result<Option<Value>> {
        let lifecycle = self.lifecycle(resource_type)?;
        let mut instance = restore(lifecycle, state)?;
        lifecycle.refresh(&mut instance)?;
        Ok(instance
            .is_present()
            .then(|| instance.observed().to_value()))
    }

    fn update(&self, resource_type: &str, prior: Value, planned: Value) -> Result<Value> {
        let lifecycle = self.lifecycle(resource_type)?;
        let mut instance = restore(lifecycle, prior)?;
        lifecycle.update(&mut instance, &instance_from(planned)?)?;
        Ok(instance.observed().to_value())
    }

    fn delete(&self, resource_type: &str, state: Value) -> Result<()> {
        let lifecycle = self.lifecycle(resource_type)?;
        let mut instance = restore(lifecycle, state)?;
        lifecycle.delete(&mut instance)
    }

    fn import(&self, resource_type: &str, id: &str) -> Result<Value> {
        let instance = self.lifecycle(resource_type)?.import(id)?;
        Ok(instance.observed().to_value())
    }
}

fn instance_from(value: Value) -> Result<ResourceInstance> {
    ResourceInstance::from_value(value)
        .ok_or_else(|| ProviderError::InvalidInstance("state must be a JSON object".to_string()))
}

/// Rebuild a present instance from host-held state
fn restore(lifecycle: &ResourceLifecycle, state: Value) -> Result<ManagedInstance> {
    let observed = instance_from(state)?;
    let schema: &ResourceSchema = lifecycle.schema();
    let id = observed
        .identifier(schema.identifier_name())
        .ok_or_else(|| {
            ProviderError::InvalidInstance(format!(
                "{} state has no '{}'",
                schema.resource_name,
                schema.identifier_name()
            ))
        })?;
    Ok(ManagedInstance::present(id, observed))
}

fn describe_properties(properties: &[PropertySchema]) -> Value {
    properties
        .iter()
        .map(|p| {
            let mut described = json!({
                "type": p.kind.type_name(),
                "required": p.required,
                "computed": p.computed,
                "force_new": p.force_new,
                "immutable": p.immutable,
                "sensitive": p.sensitive,
            });
            if let Some(description) = &p.description {
                described["description"] = json!(description);
            }
            if let Some(nested) = p.nested() {
                described["properties"] = describe_properties(nested);
            }
            (p.name.clone(), described)
        })
        .collect::<Map<String, Value>>()
        .into()
}
