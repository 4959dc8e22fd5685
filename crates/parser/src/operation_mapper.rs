//! Operation classification and CRUD mapping
//!
//! Maps (path shape, HTTP method) pairs to the CRUD role they play for a
//! resource.

use openapi_provider_common::{to_snake_case, HttpMethod};

/// CRUD operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudOperation {
    Create,
    List,
    Read,
    Update,
    Delete,
}

impl CrudOperation {
    /// Every operation a CRUD-compliant resource must declare
    pub const ALL: [CrudOperation; 5] = [
        CrudOperation::Create,
        CrudOperation::List,
        CrudOperation::Read,
        CrudOperation::Update,
        CrudOperation::Delete,
    ];
}

/// Shape of an API path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Root path of a resource, e.g. `/v1/cdns`
    Collection,
    /// Root path plus an identifier segment, e.g. `/v1/cdns/{id}`
    Instance,
}

/// Classifies document operations into CRUD operations
pub struct OperationClassifier;

impl OperationClassifier {
    /// Classify an operation by the path it is declared on and its method
    ///
    /// # Examples
    /// ```
    /// use openapi_provider_common::HttpMethod;
    /// use openapi_provider_parser::{CrudOperation, OperationClassifier, PathKind};
    ///
    /// assert_eq!(
    ///     OperationClassifier::classify(PathKind::Collection, HttpMethod::Post),
    ///     Some(CrudOperation::Create)
    /// );
    /// assert_eq!(
    ///     OperationClassifier::classify(PathKind::Instance, HttpMethod::Put),
    ///     Some(CrudOperation::Update)
    /// );
    /// ```
    pub fn classify(kind: PathKind, method: HttpMethod) -> Option<CrudOperation> {
        match (kind, method) {
            (PathKind::Collection, HttpMethod::Post) => Some(CrudOperation::Create),
            (PathKind::Collection, HttpMethod::Get) => Some(CrudOperation::List),
            (PathKind::Instance, HttpMethod::Get) => Some(CrudOperation::Read),
            (PathKind::Instance, HttpMethod::Put) => Some(CrudOperation::Update),
            (PathKind::Instance, HttpMethod::Delete) => Some(CrudOperation::Delete),
            // PATCH semantics vary too much between APIs to drive updates
            _ => None,
        }
    }

    /// Determine whether a path addresses a collection or one instance
    pub fn path_kind(path: &str) -> PathKind {
        match path.rsplit('/').find(|s| !s.is_empty()) {
            Some(last) if is_parameter(last) => PathKind::Instance,
            _ => PathKind::Collection,
        }
    }

    /// Extract the resource name from a root path
    ///
    /// # Examples
    /// ```
    /// use openapi_provider_parser::OperationClassifier;
    ///
    /// assert_eq!(
    ///     OperationClassifier::extract_resource("/v1/cdns"),
    ///     Some("cdns".to_string())
    /// );
    /// ```
    pub fn extract_resource(path: &str) -> Option<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .rev()
            .find(|s| !is_parameter(s))
            .map(to_snake_case)
            .filter(|name| !name.is_empty())
    }

    /// Name of the parameter in an instance path's final segment
    pub fn instance_parameter(path: &str) -> Option<&str> {
        let last = path.rsplit('/').find(|s| !s.is_empty())?;
        last.strip_prefix('{')?.strip_suffix('}')
    }
}

/// Whether a path segment is a `{parameter}` placeholder
pub fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_collection() {
        assert_eq!(
            OperationClassifier::classify(PathKind::Collection, HttpMethod::Post),
            Some(CrudOperation::Create)
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Collection, HttpMethod::Get),
            Some(CrudOperation::List)
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Collection, HttpMethod::Delete),
            None
        );
    }

    #[test]
    fn test_classify_instance() {
        assert_eq!(
            OperationClassifier::classify(PathKind::Instance, HttpMethod::Get),
            Some(CrudOperation::Read)
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Instance, HttpMethod::Put),
            Some(CrudOperation::Update)
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Instance, HttpMethod::Delete),
            Some(CrudOperation::Delete)
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Instance, HttpMethod::Patch),
            None
        );
        assert_eq!(
            OperationClassifier::classify(PathKind::Instance, HttpMethod::Post),
            None
        );
    }

    #[test]
    fn test_path_kind() {
        assert_eq!(OperationClassifier::path_kind("/v1/cdns"), PathKind::Collection);
        assert_eq!(OperationClassifier::path_kind("/v1/cdns/{id}"), PathKind::Instance);
        assert_eq!(OperationClassifier::path_kind("/v1/cdns/{id}/"), PathKind::Instance);
    }

    #[test]
    fn test_extract_resource() {
        assert_eq!(
            OperationClassifier::extract_resource("/v1/cdns"),
            Some("cdns".to_string())
        );
        assert_eq!(
            OperationClassifier::extract_resource("/v1/cdns/{id}"),
            Some("cdns".to_string())
        );
        assert_eq!(
            OperationClassifier::extract_resource("/api/load-balancers"),
            Some("load_balancers".to_string())
        );
        assert_eq!(OperationClassifier::extract_resource("/"), None);
    }

    #[test]
    fn test_instance_parameter() {
        assert_eq!(OperationClassifier::instance_parameter("/v1/cdns/{id}"), Some("id"));
        assert_eq!(OperationClassifier::instance_parameter("/v1/cdns"), None);
    }
}
