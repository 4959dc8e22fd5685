//! Resource lifecycle state machine
//!
//! ```text
//! Absent -> Creating -> Present -> Updating -> Present -> Deleting -> Absent
//!                       Present -> Refreshing -> Present | Absent
//! ```
//!
//! A failed transition leaves the instance in the state it started from.

use openapi_provider_client::{codec, HttpEndpointConfig, HttpResourceClient};
use openapi_provider_common::{
    PropertyKind, PropertySchema, ProviderError, ResourceInstance, ResourceSchema, Result,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a managed instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Updating,
    Refreshing,
    Deleting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Absent => "absent",
            LifecycleState::Creating => "creating",
            LifecycleState::Present => "present",
            LifecycleState::Updating => "updating",
            LifecycleState::Refreshing => "refreshing",
            LifecycleState::Deleting => "deleting",
        };
        f.write_str(name)
    }
}

/// One instance of a resource as tracked by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedInstance {
    state: LifecycleState,
    identifier: Option<String>,
    observed: ResourceInstance,
}

impl ManagedInstance {
    /// An instance that does not exist yet
    pub fn absent() -> Self {
        Self {
            state: LifecycleState::Absent,
            identifier: None,
            observed: ResourceInstance::new(),
        }
    }

    /// An instance known to exist, restored from previously observed state
    pub fn present(identifier: impl Into<String>, observed: ResourceInstance) -> Self {
        Self {
            state: LifecycleState::Present,
            identifier: Some(identifier.into()),
            observed,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Server-assigned identifier, fixed once the instance is created
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Last state observed from the remote API
    pub fn observed(&self) -> &ResourceInstance {
        &self.observed
    }

    pub fn is_present(&self) -> bool {
        self.state == LifecycleState::Present
    }

    fn transition(&mut self, to: LifecycleState) {
        debug!("{} -> {}", self.state, to);
        self.state = to;
    }

    fn clear(&mut self) {
        self.transition(LifecycleState::Absent);
        self.identifier = None;
        self.observed = ResourceInstance::new();
    }

    fn require(&self, operation: &'static str, state: LifecycleState) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(ProviderError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn present_identifier(&self, operation: &'static str) -> Result<String> {
        self.require(operation, LifecycleState::Present)?;
        self.identifier
            .clone()
            .ok_or_else(|| ProviderError::InvalidState {
                operation,
                state: "present without an identifier".to_string(),
            })
    }
}

/// A difference between desired and observed state of one property
///
/// A property the desired state no longer sets has a `desired` of null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyChange {
    pub property: String,
    pub desired: Value,
    pub observed: Option<Value>,

    /// The property, or a changed field nested in it, is force-new;
    /// applying the change recreates the resource
    pub requires_replacement: bool,

    /// The property, or a changed field nested in it, cannot be changed
    /// after creation
    pub immutable: bool,
}

impl PropertyChange {
    /// The desired state dropped a property the remote resource still has
    pub fn is_removal(&self) -> bool {
        self.desired.is_null()
    }
}

/// Drives instances of one resource type through the lifecycle
///
/// The schema and endpoint are shared with every other holder of the same
/// resource type and never mutated.
#[derive(Clone)]
pub struct ResourceLifecycle {
    schema: Arc<ResourceSchema>,
    endpoint: Arc<HttpEndpointConfig>,
    client: HttpResourceClient,
}

impl ResourceLifecycle {
    pub fn new(
        schema: Arc<ResourceSchema>,
        endpoint: Arc<HttpEndpointConfig>,
        client: HttpResourceClient,
    ) -> Self {
        Self {
            schema,
            endpoint,
            client,
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn endpoint(&self) -> &HttpEndpointConfig {
        &self.endpoint
    }

    /// Create the remote resource
    ///
    /// The desired state is validated before any request is sent.
    pub fn create(&self, instance: &mut ManagedInstance, desired: &ResourceInstance) -> Result<()> {
        instance.require("create", LifecycleState::Absent)?;
        codec::validate(&self.schema, desired)?;
        let desired = codec::apply_defaults(&self.schema, desired);

        instance.transition(LifecycleState::Creating);
        match self.client.create(&self.schema, &self.endpoint, &desired) {
            Ok(observed) => {
                let identifier = observed.identifier(self.schema.identifier_name());
                info!(
                    "Created {} '{}'",
                    self.schema.resource_name,
                    identifier.as_deref().unwrap_or_default()
                );
                instance.identifier = identifier;
                instance.observed = observed;
                instance.transition(LifecycleState::Present);
                Ok(())
            }
            Err(err) => {
                instance.transition(LifecycleState::Absent);
                Err(err)
            }
        }
    }

    /// Re-read the remote resource
    ///
    /// An instance deleted out of band becomes `Absent`.
    pub fn refresh(&self, instance: &mut ManagedInstance) -> Result<()> {
        let id = instance.present_identifier("refresh")?;

        instance.transition(LifecycleState::Refreshing);
        match self.client.read(&self.schema, &self.endpoint, &id) {
            Ok(Some(observed)) => {
                instance.observed = observed;
                instance.transition(LifecycleState::Present);
                Ok(())
            }
            Ok(None) => {
                info!(
                    "{} '{}' no longer exists",
                    self.schema.resource_name, id
                );
                instance.clear();
                Ok(())
            }
            Err(err) => {
                instance.transition(LifecycleState::Present);
                Err(err)
            }
        }
    }

    /// Adopt an existing remote resource by identifier
    pub fn import(&self, id: &str) -> Result<ManagedInstance> {
        let observed = self
            .client
            .read(&self.schema, &self.endpoint, id)?
            .ok_or_else(|| ProviderError::NotFound {
                resource: self.schema.resource_name.clone(),
                id: id.to_string(),
            })?;
        info!("Imported {} '{}'", self.schema.resource_name, id);
        Ok(ManagedInstance::present(id, observed))
    }

    /// Differences between the desired state and the last observed state
    ///
    /// Besides the changes `diff` reports, this lists caller-managed
    /// properties without a default that the remote resource has but the
    /// desired state no longer sets. `update` leaves those untouched.
    pub fn drift(&self, instance: &ManagedInstance, desired: &ResourceInstance) -> Vec<PropertyChange> {
        let mut changes = diff(&self.schema, &instance.observed, desired);
        changes.extend(removals(&self.schema, &instance.observed, desired));
        changes
    }

    /// Bring the remote resource in line with the desired state
    ///
    /// Changes to force-new properties fail with `ReplacementRequired` and
    /// changes to immutable properties with `ImmutablePropertyChanged`; in
    /// both cases no request is sent. Without changes nothing is sent either.
    pub fn update(&self, instance: &mut ManagedInstance, desired: &ResourceInstance) -> Result<()> {
        let id = instance.present_identifier("update")?;
        codec::validate(&self.schema, desired)?;

        let changes = diff(&self.schema, &instance.observed, desired);
        if changes.is_empty() {
            debug!("{} '{}' is up to date", self.schema.resource_name, id);
            return Ok(());
        }

        let replaced = changed_names(&changes, |c| c.requires_replacement);
        if !replaced.is_empty() {
            return Err(ProviderError::ReplacementRequired {
                properties: replaced,
            });
        }
        let immutable = changed_names(&changes, |c| c.immutable);
        if !immutable.is_empty() {
            return Err(ProviderError::ImmutablePropertyChanged {
                properties: immutable,
            });
        }

        // unchanged properties keep their observed values in the request
        let mut merged = instance.observed.clone();
        for property in self.schema.properties.iter().filter(|p| p.is_updatable()) {
            if let Some(value) = desired.get(&property.name) {
                merged.set(property.name.clone(), value.clone());
            }
        }

        instance.transition(LifecycleState::Updating);
        match self.client.update(&self.schema, &self.endpoint, &id, &merged) {
            Ok(observed) => {
                info!(
                    "Updated {} '{}' ({} changed)",
                    self.schema.resource_name,
                    id,
                    changes.len()
                );
                merged.merge(&observed);
                instance.observed = merged;
                instance.transition(LifecycleState::Present);
                Ok(())
            }
            Err(err) => {
                instance.transition(LifecycleState::Present);
                Err(err)
            }
        }
    }

    /// Delete the remote resource; deleting an absent instance does nothing
    pub fn delete(&self, instance: &mut ManagedInstance) -> Result<()> {
        if instance.state == LifecycleState::Absent {
            return Ok(());
        }
        let id = instance.present_identifier("delete")?;

        instance.transition(LifecycleState::Deleting);
        match self.client.delete(&self.schema, &self.endpoint, &id) {
            Ok(()) => {
                info!("Deleted {} '{}'", self.schema.resource_name, id);
                instance.clear();
                Ok(())
            }
            Err(err) => {
                instance.transition(LifecycleState::Present);
                Err(err)
            }
        }
    }
}

fn changed_names(changes: &[PropertyChange], pick: impl Fn(&PropertyChange) -> bool) -> Vec<String> {
    changes
        .iter()
        .filter(|c| pick(c))
        .map(|c| c.property.clone())
        .collect()
}

/// Compare desired against observed state
///
/// Only caller-managed properties the desired state sets are compared;
/// computed fields are ignored at every nesting level. A change is flagged
/// force-new or immutable when any changed field along its path carries
/// that flag.
pub fn diff(
    schema: &ResourceSchema,
    observed: &ResourceInstance,
    desired: &ResourceInstance,
) -> Vec<PropertyChange> {
    schema
        .properties
        .iter()
        .filter(|p| !p.computed)
        .filter_map(|property| {
            let wanted = desired.get(&property.name)?;
            let current = observed.get(&property.name);
            let delta = compare(&property.kind, wanted, current).flagged(property);
            delta.changed.then(|| PropertyChange {
                property: property.name.clone(),
                desired: wanted.clone(),
                observed: current.cloned(),
                requires_replacement: delta.force_new,
                immutable: delta.immutable,
            })
        })
        .collect()
}

fn removals<'a>(
    schema: &'a ResourceSchema,
    observed: &'a ResourceInstance,
    desired: &'a ResourceInstance,
) -> impl Iterator<Item = PropertyChange> + 'a {
    schema
        .properties
        .iter()
        .filter(|p| !p.computed && !p.identifier && p.default.is_none())
        .filter(move |p| desired.get(&p.name).is_none())
        .filter_map(move |property| {
            let current = observed.get(&property.name)?;
            Some(PropertyChange {
                property: property.name.clone(),
                desired: Value::Null,
                observed: Some(current.clone()),
                requires_replacement: property.force_new,
                immutable: property.immutable,
            })
        })
}

/// Outcome of comparing one value against its observed counterpart
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Delta {
    changed: bool,
    force_new: bool,
    immutable: bool,
}

impl Delta {
    fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    fn absorb(&mut self, other: Delta) {
        self.changed |= other.changed;
        self.force_new |= other.force_new;
        self.immutable |= other.immutable;
    }

    /// Attach the flags of the property holding the compared value
    fn flagged(mut self, property: &PropertySchema) -> Self {
        if self.changed {
            self.force_new |= property.force_new;
            self.immutable |= property.immutable;
        }
        self
    }
}

fn compare(kind: &PropertyKind, desired: &Value, observed: Option<&Value>) -> Delta {
    let observed = observed.filter(|v| !v.is_null());
    match (kind, desired) {
        (PropertyKind::Object(properties), Value::Object(want)) => {
            let have = match observed {
                Some(Value::Object(have)) => Some(have),
                Some(_) => return Delta::changed(),
                None => None,
            };
            let mut delta = Delta {
                changed: have.is_none(),
                ..Delta::default()
            };
            for property in properties.iter().filter(|p| !p.computed) {
                if let Some(w) = want.get(&property.name).filter(|v| !v.is_null()) {
                    let h = have.and_then(|have| have.get(&property.name));
                    delta.absorb(compare(&property.kind, w, h).flagged(property));
                }
            }
            delta
        }
        (PropertyKind::List(element), Value::Array(want)) => {
            let have = match observed {
                Some(Value::Array(have)) => Some(have),
                Some(_) => return Delta::changed(),
                None => None,
            };
            let mut delta = Delta {
                changed: have.map_or(true, |have| have.len() != want.len()),
                ..Delta::default()
            };
            for (i, w) in want.iter().enumerate() {
                delta.absorb(compare(element, w, have.and_then(|have| have.get(i))));
            }
            delta
        }
        (PropertyKind::Map(element), Value::Object(want)) => {
            let have = match observed {
                Some(Value::Object(have)) => Some(have),
                Some(_) => return Delta::changed(),
                None => None,
            };
            let mut delta = Delta {
                changed: have.map_or(true, |have| have.len() != want.len()),
                ..Delta::default()
            };
            for (key, w) in want {
                delta.absorb(compare(element, w, have.and_then(|have| have.get(key))));
            }
            delta
        }
        (PropertyKind::Integer | PropertyKind::Number, Value::Number(w)) => match observed {
            Some(Value::Number(h)) if w.as_f64() == h.as_f64() => Delta::default(),
            _ => Delta::changed(),
        },
        _ if observed == Some(desired) => Delta::default(),
        _ => Delta::changed(),
    }
}
