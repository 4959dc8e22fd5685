//! OpenAPI document analysis
//!
//! Loads Swagger 2.0 / OpenAPI 3.x documents, discovers CRUD-compliant
//! resources, and synthesizes a generic schema for each.
//!
//! ## Resource discovery
//! A resource is a root path with POST and GET plus an instance path
//! (`root/{id}`) with GET, PUT, and DELETE:
//!
//! ```text
//! POST   /v1/cdns          create
//! GET    /v1/cdns          list
//! GET    /v1/cdns/{id}     read
//! PUT    /v1/cdns/{id}     update
//! DELETE /v1/cdns/{id}     delete
//! ```
//!
//! ## Vendor extensions
//! - `x-terraform-exclude-resource`, `x-terraform-resource-name` on the create operation
//! - `x-terraform-immutable`, `x-terraform-force-new`, `x-terraform-sensitive`,
//!   `x-terraform-computed`, `x-terraform-id`, `x-terraform-field-name` on properties
//!
//! ## Usage
//! ```rust,ignore
//! use openapi_provider_parser::openapi::{OpenApiParser, SchemaSynthesizer};
//!
//! let parser = OpenApiParser::from_file("swagger.json")?;
//! let synthesizer = SchemaSynthesizer::new(parser.document());
//! for resource in parser.resources() {
//!     let synthesis = synthesizer.synthesize_descriptor(&resource)?;
//!     println!("{}: {} properties", resource.name, synthesis.schema.properties.len());
//! }
//! ```

mod analyser;
mod parser;
mod synthesizer;
mod types;

pub use analyser::{
    HeaderParameter, ResourceDescriptor, ResourceOperations, SpecAnalyser,
    DEFAULT_API_KEY_HEADER,
};
pub use parser::OpenApiParser;
pub use synthesizer::{SchemaSynthesizer, Synthesis, SynthesisWarning};
pub use types::*;
