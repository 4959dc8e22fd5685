//! End-to-end tests of the ureq transport against a local HTTP server

use openapi_provider_client::{HttpEndpointConfig, HttpResourceClient, UreqTransport};
use openapi_provider_common::{
    PropertyKind, PropertySchema, ProviderError, ResourceInstance, ResourceSchema,
};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

struct Recorded {
    method: String,
    url: String,
    api_key: Option<String>,
    body: String,
}

/// Serve `responses` in order, then report what was received
fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<Recorded>>) {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let base_url = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for (status, body) in responses {
            let mut request = server.recv().expect("receive request");
            let mut content = String::new();
            request.as_reader().read_to_string(&mut content).unwrap();
            recorded.push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                api_key: request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.to_string()),
                body: content,
            });
            let header = Header::from_bytes("Content-Type", "application/json").unwrap();
            request
                .respond(
                    Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                )
                .unwrap();
        }
        recorded
    });

    (base_url, handle)
}

fn schema() -> ResourceSchema {
    ResourceSchema::new(
        "cdns",
        vec![
            PropertySchema::identifier("id"),
            PropertySchema::new("label", PropertyKind::String).required(),
            PropertySchema::new("example_int", PropertyKind::Integer).with_api_name("exampleInt"),
        ],
    )
}

fn client() -> HttpResourceClient {
    HttpResourceClient::new(Arc::new(UreqTransport::new(Duration::from_secs(5))))
}

#[test]
fn test_crud_over_http() {
    let (base_url, handle) = serve(vec![
        (201, r#"{"id": "abc", "label": "x", "exampleInt": 1}"#),
        (200, r#"{"id": "abc", "label": "x", "exampleInt": 2}"#),
        (204, ""),
        (404, r#"{"code": "not_found", "message": "no such cdn"}"#),
    ]);
    let endpoint = HttpEndpointConfig::new(base_url, "/v1/cdns")
        .with_api_key("Authorization", Some("secret".to_string()));
    let client = client();
    let schema = schema();

    let desired = ResourceInstance::new()
        .with("label", json!("x"))
        .with("example_int", json!(1));
    let created = client.create(&schema, &endpoint, &desired).unwrap();
    assert_eq!(created.identifier("id"), Some("abc".to_string()));

    let observed = client.read(&schema, &endpoint, "abc").unwrap().unwrap();
    assert_eq!(observed.get("example_int"), Some(&json!(2)));

    client.delete(&schema, &endpoint, "abc").unwrap();
    assert!(client.read(&schema, &endpoint, "abc").unwrap().is_none());

    let recorded = handle.join().unwrap();
    assert_eq!(recorded.len(), 4);
    assert_eq!(recorded[0].method, "POST");
    assert_eq!(recorded[0].url, "/v1/cdns");
    let sent: Value = serde_json::from_str(&recorded[0].body).unwrap();
    assert_eq!(sent, json!({"label": "x", "exampleInt": 1}));
    assert_eq!(recorded[2].method, "DELETE");
    assert_eq!(recorded[2].url, "/v1/cdns/abc");
    assert!(recorded
        .iter()
        .all(|r| r.api_key.as_deref() == Some("secret")));
}

#[test]
fn test_server_errors_are_returned_not_raised() {
    let (base_url, handle) = serve(vec![
        (401, r#"{"message": "bad key"}"#),
        (500, "internal error"),
    ]);
    let endpoint = HttpEndpointConfig::new(base_url, "/v1/cdns");
    let client = client();
    let schema = schema();

    let err = client.read(&schema, &endpoint, "abc").unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Authentication { status: 401, ref body } if body == "bad key"
    ));

    let err = client.delete(&schema, &endpoint, "abc").unwrap_err();
    assert_eq!(err.status(), Some(500));

    let recorded = handle.join().unwrap();
    assert!(recorded.iter().all(|r| r.api_key.is_none()));
}
