//! OpenAPI parsing for the OpenAPI Provider
//!
//! This crate turns an OpenAPI document into the resource descriptors and
//! generic schemas the provider is assembled from.
//!
//! ## Strategy
//!
//! Paths are grouped into resources by shape and method:
//! - `POST /root` → Create, `GET /root` → List
//! - `GET /root/{id}` → Read, `PUT /root/{id}` → Update, `DELETE /root/{id}` → Delete
//!
//! Each resource's body schema is then synthesized into a `ResourceSchema`.

pub mod openapi;
mod operation_mapper;
mod type_mapper;

pub use openapi::{
    HeaderParameter, OpenApiDocument, OpenApiParser, ResourceDescriptor, SchemaSynthesizer,
    SpecAnalyser, SpecVersion, Synthesis, SynthesisWarning,
};
pub use operation_mapper::{is_parameter, CrudOperation, OperationClassifier, PathKind};
pub use type_mapper::TypeMapper;
