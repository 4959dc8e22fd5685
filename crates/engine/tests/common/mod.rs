//! Shared fixtures: an in-memory CRUD backend behind the `Transport` seam

#![allow(dead_code)]

use openapi_provider_client::{HttpRequest, HttpResponse, Transport};
use openapi_provider_common::{HttpMethod, ProviderConfig, Result};
use openapi_provider_engine::Provider;
use openapi_provider_parser::OpenApiParser;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "http://backend.test";
pub const API_KEY: &str = "secret";

/// Stores resources per collection path and answers like a well-behaved API
pub struct InMemoryBackend {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    requests: Mutex<Vec<HttpRequest>>,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            collections: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn stored(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Remove a resource behind the provider's back
    pub fn remove_out_of_band(&self, collection: &str, id: &str) {
        if let Some(c) = self.collections.lock().unwrap().get_mut(collection) {
            c.remove(id);
        }
    }

    fn route(&self, url: &str) -> (String, Option<String>) {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [version, collection] => (format!("/{}/{}", version, collection), None),
            [version, collection, id] => (
                format!("/{}/{}", version, collection),
                Some(id.to_string()),
            ),
            _ => (path.to_string(), None),
        }
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.header("Authorization") != Some(API_KEY) {
            return error(401, "unauthorized", "missing or invalid API key");
        }

        let (collection, id) = self.route(&request.url);
        let mut collections = self.collections.lock().unwrap();
        let store = collections.entry(collection).or_default();

        match (request.method, id) {
            (HttpMethod::Post, None) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
                let mut body = request.body.clone().unwrap_or_else(|| json!({}));
                body["id"] = Value::String(id.clone());
                if body.get("name").is_some() {
                    body["status"] = json!("deployed");
                }
                store.insert(id, body.clone());
                HttpResponse::new(201, body.to_string())
            }
            (HttpMethod::Get, None) => {
                let items: Vec<&Value> = store.values().collect();
                HttpResponse::new(200, json!(items).to_string())
            }
            (HttpMethod::Get, Some(id)) => match store.get(&id) {
                Some(body) => HttpResponse::new(200, body.to_string()),
                None => error(404, "not_found", "resource not found"),
            },
            (HttpMethod::Put, Some(id)) => match store.get_mut(&id) {
                Some(existing) => {
                    if let (Some(target), Some(Value::Object(update))) =
                        (existing.as_object_mut(), request.body.as_ref())
                    {
                        for (key, value) in update {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                    HttpResponse::new(200, existing.to_string())
                }
                None => error(404, "not_found", "resource not found"),
            },
            (HttpMethod::Delete, Some(id)) => match store.remove(&id) {
                Some(_) => HttpResponse::new(204, ""),
                None => error(404, "not_found", "resource not found"),
            },
            _ => error(405, "method_not_allowed", "unsupported operation"),
        }
    }
}

impl Transport for InMemoryBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.handle(request))
    }
}

fn error(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(status, json!({"code": code, "message": message}).to_string())
}

/// The CDN document shared with the parser tests
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../parser/tests/fixtures/cdn_swagger.json")
}

/// Origins carry a nested object with force-new and immutable fields
pub const ORIGINS: &str = r#"
swagger: "2.0"
basePath: /v1
paths:
  /origins:
    post:
      parameters:
        - in: body
          name: body
          schema:
            type: object
            required: [name]
            properties:
              id: {type: string, readOnly: true}
              name: {type: string}
              upstream:
                type: object
                properties:
                  region: {type: string, x-terraform-force-new: true}
                  owner: {type: string, x-terraform-immutable: true}
                  host: {type: string}
    get: {}
  /origins/{id}:
    get: {}
    put: {}
    delete: {}
"#;

pub fn config(api_key: Option<&str>) -> ProviderConfig {
    let mut config = ProviderConfig::new("openapi")
        .with_base_url(BASE_URL)
        .with_header("X-Request-ID", "req-1");
    config.api_key = api_key.map(str::to_string);
    config
}

/// Assemble the CDN fixture provider against `backend`
pub fn provider(backend: Arc<InMemoryBackend>, api_key: Option<&str>) -> Provider {
    let parser = OpenApiParser::from_file(fixture_path()).expect("Failed to load fixture");
    Provider::from_document(&config(api_key), parser.document(), backend)
        .expect("Failed to assemble provider")
}

/// Assemble a provider from an inline document against `backend`
pub fn provider_from(document: &str, backend: Arc<InMemoryBackend>) -> Provider {
    let parser = OpenApiParser::from_str(document).expect("Failed to parse document");
    Provider::from_document(&config(Some(API_KEY)), parser.document(), backend)
        .expect("Failed to assemble provider")
}

pub fn cdn() -> Value {
    json!({
        "label": "x",
        "ips": ["1.1.1.1"],
        "hostnames": ["a.com"]
    })
}
