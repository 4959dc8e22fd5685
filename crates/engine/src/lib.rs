//! Resource lifecycle and provider assembly for OpenAPI Provider
//!
//! [`Provider::build`] turns a [`ProviderConfig`](openapi_provider_common::ProviderConfig)
//! into a set of registered resource types, each driven through its
//! lifecycle by a [`ResourceLifecycle`]. Hosts talk to the result through the
//! [`ResourceProvider`] trait.

mod assembly;
mod host;
pub mod lifecycle;

pub use assembly::{Provider, RegisteredResource};
pub use host::{PlanResult, ResourceProvider};
pub use lifecycle::{LifecycleState, ManagedInstance, PropertyChange, ResourceLifecycle};
