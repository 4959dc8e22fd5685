//! Discovers CRUD-compliant resources in an OpenAPI document
//!
//! A resource is a root path supporting POST (create) and GET (list) paired
//! with an instance path (root + `/{param}`) supporting GET, PUT, and DELETE.
//! Paths that do not satisfy the rule are simply not exposed.

use super::types::{OpenApiDocument, Operation, Parameter, PathItem, SchemaOrRef};
use crate::operation_mapper::{is_parameter, CrudOperation, OperationClassifier, PathKind};
use openapi_provider_common::to_snake_case;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Header used for the API key when the document declares none
pub const DEFAULT_API_KEY_HEADER: &str = "Authorization";

/// Excludes a resource when set on its create operation
pub const EXCLUDE_RESOURCE_EXTENSION: &str = "x-terraform-exclude-resource";

/// Overrides the resource name when set on its create operation
pub const RESOURCE_NAME_EXTENSION: &str = "x-terraform-resource-name";

/// The five operations of a CRUD-compliant resource
#[derive(Debug, Clone)]
pub struct ResourceOperations {
    pub create: Operation,
    pub list: Operation,
    pub read: Operation,
    pub update: Operation,
    pub delete: Operation,
}

/// A header parameter declared by a resource's operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParameter {
    pub name: String,
    pub required: bool,
}

/// One manageable resource discovered in the document
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Resource name, e.g. "cdns"
    pub name: String,

    /// Collection path, e.g. "/v1/cdns"
    pub root_path: String,

    /// Instance path, e.g. "/v1/cdns/{id}"
    pub instance_path: String,

    /// Name of the instance path parameter, e.g. "id"
    pub id_parameter: String,

    pub operations: ResourceOperations,

    /// Schema of the request/response body
    pub body_schema: SchemaOrRef,

    /// Header parameters declared on either path
    pub headers: Vec<HeaderParameter>,
}

impl ResourceDescriptor {
    pub fn description(&self) -> Option<&str> {
        self.operations
            .create
            .description
            .as_deref()
            .or(self.operations.create.summary.as_deref())
    }
}

/// Answers which paths are resources and what their bodies look like
pub struct SpecAnalyser<'a> {
    document: &'a OpenApiDocument,
}

impl<'a> SpecAnalyser<'a> {
    pub fn new(document: &'a OpenApiDocument) -> Self {
        Self { document }
    }

    /// Discover every CRUD-compliant resource, ordered by root path
    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        let paths = self.normalized_paths();
        let mut seen_names = HashSet::new();
        let mut resources = Vec::new();

        for (path, item) in &paths {
            if OperationClassifier::path_kind(path) != PathKind::Collection {
                continue;
            }

            let Some(descriptor) = self.analyse_root(path, item, &paths) else {
                continue;
            };

            if !seen_names.insert(descriptor.name.clone()) {
                warn!(
                    "Skipping {}: resource name '{}' is already taken",
                    path, descriptor.name
                );
                continue;
            }

            debug!(
                "Discovered resource '{}' at {} / {}",
                descriptor.name, descriptor.root_path, descriptor.instance_path
            );
            resources.push(descriptor);
        }

        resources
    }

    /// Base URL of the API, if the document declares one
    pub fn base_url(&self) -> Option<String> {
        self.document.base_url()
    }

    /// Header that carries the API key
    pub fn api_key_header(&self) -> String {
        self.document
            .api_key_header()
            .unwrap_or(DEFAULT_API_KEY_HEADER)
            .to_string()
    }

    /// Paths without trailing slashes; the first spelling wins on collision
    fn normalized_paths(&self) -> BTreeMap<String, &'a PathItem> {
        let mut paths = BTreeMap::new();
        for (path, item) in &self.document.paths {
            let normalized = normalize_path(path);
            paths.entry(normalized).or_insert(item);
        }
        paths
    }

    fn analyse_root(
        &self,
        root_path: &str,
        root: &PathItem,
        paths: &BTreeMap<String, &'a PathItem>,
    ) -> Option<ResourceDescriptor> {
        if root_path.split('/').any(is_parameter) {
            debug!("Skipping {}: parameterised root paths are not supported", root_path);
            return None;
        }

        let Some((instance_path, instance)) = find_instance_path(root_path, paths) else {
            debug!("Skipping {}: no matching instance path", root_path);
            return None;
        };

        let operations = match collect_operations(root, instance) {
            Ok(operations) => operations,
            Err(missing) => {
                debug!(
                    "Skipping {}: missing {:?} operations",
                    root_path, missing
                );
                return None;
            }
        };

        if operations.create.extension_bool(EXCLUDE_RESOURCE_EXTENSION) {
            debug!("Skipping {}: excluded by {}", root_path, EXCLUDE_RESOURCE_EXTENSION);
            return None;
        }

        let name = match operations.create.extension_str(RESOURCE_NAME_EXTENSION) {
            Some(custom) => to_snake_case(custom),
            None => OperationClassifier::extract_resource(root_path)?,
        };

        let Some(body_schema) = operations
            .create
            .body_schema()
            .or_else(|| operations.read.response_schema(&["200"]))
            .cloned()
        else {
            warn!("Skipping {}: no request or response body schema", root_path);
            return None;
        };

        let id_parameter = OperationClassifier::instance_parameter(&instance_path)
            .unwrap_or("id")
            .to_string();

        let headers = collect_headers(root, instance, &operations);

        Some(ResourceDescriptor {
            name,
            root_path: root_path.to_string(),
            instance_path,
            id_parameter,
            operations,
            body_schema,
            headers,
        })
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Find `root/{param}` among the document paths
fn find_instance_path<'p>(
    root_path: &str,
    paths: &BTreeMap<String, &'p PathItem>,
) -> Option<(String, &'p PathItem)> {
    let prefix = format!("{}/", root_path.trim_end_matches('/'));
    paths.iter().find_map(|(path, item)| {
        let rest = path.strip_prefix(&prefix)?;
        (!rest.contains('/') && is_parameter(rest)).then(|| (path.clone(), *item))
    })
}

/// Gather the five CRUD operations, or report which are missing
fn collect_operations(
    root: &PathItem,
    instance: &PathItem,
) -> Result<ResourceOperations, Vec<CrudOperation>> {
    let mut found: Vec<(CrudOperation, &Operation)> = Vec::new();
    for (kind, item) in [(PathKind::Collection, root), (PathKind::Instance, instance)] {
        for (method, operation) in item.operations() {
            if let Some(crud) = OperationClassifier::classify(kind, method) {
                found.push((crud, operation));
            }
        }
    }

    let take = |crud: CrudOperation| {
        found
            .iter()
            .find(|(c, _)| *c == crud)
            .map(|(_, op)| (*op).clone())
    };

    match (
        take(CrudOperation::Create),
        take(CrudOperation::List),
        take(CrudOperation::Read),
        take(CrudOperation::Update),
        take(CrudOperation::Delete),
    ) {
        (Some(create), Some(list), Some(read), Some(update), Some(delete)) => {
            Ok(ResourceOperations {
                create,
                list,
                read,
                update,
                delete,
            })
        }
        _ => Err(CrudOperation::ALL
            .into_iter()
            .filter(|crud| !found.iter().any(|(c, _)| c == crud))
            .collect()),
    }
}

/// Header parameters from path-level and operation-level declarations
fn collect_headers(
    root: &PathItem,
    instance: &PathItem,
    operations: &ResourceOperations,
) -> Vec<HeaderParameter> {
    let declared = root
        .parameters
        .iter()
        .chain(instance.parameters.iter())
        .filter(|p| p.location == "header")
        .chain(
            [
                &operations.create,
                &operations.list,
                &operations.read,
                &operations.update,
                &operations.delete,
            ]
            .into_iter()
            .flat_map(|op| op.header_parameters()),
        );

    let mut headers: Vec<HeaderParameter> = Vec::new();
    for parameter in declared {
        merge_header(&mut headers, parameter);
    }
    headers
}

fn merge_header(headers: &mut Vec<HeaderParameter>, parameter: &Parameter) {
    if parameter.name.is_empty() {
        return;
    }
    match headers
        .iter_mut()
        .find(|h| h.name.eq_ignore_ascii_case(&parameter.name))
    {
        Some(existing) => existing.required |= parameter.required,
        None => headers.push(HeaderParameter {
            name: parameter.name.clone(),
            required: parameter.required,
        }),
    }
}
