//! Common types and utilities for the OpenAPI Provider
//!
//! This crate contains the error taxonomy, the generic resource schema
//! representation, resource instances, and provider configuration shared by
//! the parser, client, engine, and CLI components.

mod config;
mod instance;
mod schema;

pub use config::{ProviderConfig, SpecSource, DEFAULT_TIMEOUT_SECS};
pub use instance::ResourceInstance;
pub use schema::{PropertyKind, PropertySchema, ResourceSchema};

use std::fmt;
use thiserror::Error;

/// HTTP methods the provider issues or recognises in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while assembling or operating the provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to retrieve OpenAPI document from {source_url}: {message}")]
    SpecRetrieval { source_url: String, message: String },

    #[error("Parse error: {0}")]
    SpecParse(String),

    #[error("Remote API returned HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("{resource} '{id}' was not found")]
    NotFound { resource: String, id: String },

    #[error("Change to {} requires replacing the resource", .properties.join(", "))]
    ReplacementRequired { properties: Vec<String> },

    #[error("Immutable properties cannot be updated: {}", .properties.join(", "))]
    ImmutablePropertyChanged { properties: Vec<String> },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication rejected with HTTP {status}: {body}")]
    Authentication { status: u16, body: String },

    #[error("Invalid resource instance: {0}")]
    InvalidInstance(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Cannot {operation} a resource that is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProviderError {
    /// Whether this error tells the caller to destroy and recreate the resource
    pub fn is_replacement_required(&self) -> bool {
        matches!(self, ProviderError::ReplacementRequired { .. })
    }

    /// HTTP status carried by the error, if it came from the remote API
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::RemoteApi { status, .. } | ProviderError::Authentication { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Convert PascalCase, camelCase, or kebab-case to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            // Break before an uppercase letter that follows a lowercase
            // letter or digit, or that starts a new word (HTTPServer -> http_server)
            let should_add_underscore = i > 0
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (i + 1 < chars.len() && chars[i + 1].is_lowercase()));

            if should_add_underscore && !result.ends_with('_') {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch == ' ' || ch == '.' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("hostNames"), "host_names");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("object-storage"), "object_storage");
        assert_eq!(to_snake_case("cdns"), "cdns");
        assert_eq!(to_snake_case("__test__"), "test");
    }

    #[test]
    fn test_error_status() {
        let err = ProviderError::Authentication {
            status: 401,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(ProviderError::SpecParse("bad".into()).status(), None);
    }

    #[test]
    fn test_replacement_required_message() {
        let err = ProviderError::ReplacementRequired {
            properties: vec!["ips".to_string(), "region".to_string()],
        };
        assert!(err.is_replacement_required());
        assert_eq!(
            err.to_string(),
            "Change to ips, region requires replacing the resource"
        );
    }
}
