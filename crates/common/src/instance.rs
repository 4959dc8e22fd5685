//! Concrete values of one managed resource

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from host-facing property name to value
///
/// Holds either the desired state supplied by the host or the observed state
/// decoded from the remote API. A `null` value is equivalent to an absent one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceInstance {
    values: Map<String, Value>,
}

impl ResourceInstance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an instance from a JSON object
    ///
    /// Returns `None` when the value is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(values) => Some(Self { values }),
            _ => None,
        }
    }

    /// Get a non-null value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Property names with non-null values
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Render a property value as an identifier string
    ///
    /// Strings are used as-is, numbers are formatted; anything else is not a
    /// usable identifier.
    pub fn identifier(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Overlay every non-null value of `other` onto this instance
    pub fn merge(&mut self, other: &ResourceInstance) {
        for (name, value) in other.values.iter().filter(|(_, v)| !v.is_null()) {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names().next().is_none()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl From<Map<String, Value>> for ResourceInstance {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}
