//! Integration tests for OpenAPI resource discovery and schema synthesis

use openapi_provider_common::PropertyKind;
use openapi_provider_parser::{OpenApiParser, SchemaSynthesizer, SpecAnalyser, SpecVersion};
use std::path::PathBuf;

fn fixture() -> OpenApiParser {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cdn_swagger.json");
    OpenApiParser::from_file(&path).expect("Failed to load fixture")
}

#[test]
fn test_discovers_crud_resources_only() {
    let parser = fixture();
    assert_eq!(parser.version(), SpecVersion::V2);

    let resources = parser.resources();
    let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();

    // /v1/monitors has no instance path and is not exposed
    assert_eq!(names, vec!["cdns", "lbs"]);
}

#[test]
fn test_document_level_settings() {
    let parser = fixture();
    let analyser = SpecAnalyser::new(parser.document());

    assert_eq!(analyser.base_url().as_deref(), Some("https://localhost:8443"));
    assert_eq!(analyser.api_key_header(), "Authorization");
}

#[test]
fn test_cdn_descriptor() {
    let parser = fixture();
    let resources = parser.resources();
    let cdn = resources.iter().find(|r| r.name == "cdns").unwrap();

    assert_eq!(cdn.root_path, "/v1/cdns");
    assert_eq!(cdn.instance_path, "/v1/cdns/{id}");
    assert_eq!(
        cdn.operations.create.operation_id.as_deref(),
        Some("ContentDeliveryNetworkCreateV1")
    );
    assert_eq!(cdn.description(), Some("Create cdn"));
    assert_eq!(cdn.headers.len(), 1);
    assert_eq!(cdn.headers[0].name, "X-Request-ID");
    assert!(cdn.headers[0].required);
}

#[test]
fn test_cdn_schema() {
    let parser = fixture();
    let synthesizer = SchemaSynthesizer::new(parser.document());
    let resources = parser.resources();
    let cdn = resources.iter().find(|r| r.name == "cdns").unwrap();

    let synthesis = synthesizer.synthesize_descriptor(cdn).unwrap();
    assert!(synthesis.warnings.is_empty(), "{:?}", synthesis.warnings);

    let schema = synthesis.schema;
    assert_eq!(schema.resource_name, "cdns");
    assert_eq!(schema.identifier_name(), "id");

    let label = schema.property("label").unwrap();
    assert!(label.required);
    assert!(label.immutable);

    let ips = schema.property("ips").unwrap();
    assert!(ips.force_new);

    let hostnames = schema.property("hostnames").unwrap();
    assert!(!hostnames.force_new && !hostnames.immutable && !hostnames.computed);

    assert_eq!(schema.property("example_number").unwrap().kind, PropertyKind::Number);
    assert_eq!(schema.property("example_boolean").unwrap().kind, PropertyKind::Boolean);

    let object = schema.property("object_property").unwrap();
    assert_eq!(object.api_name, "objectProperty");
    let nested = object.nested().unwrap();
    assert_eq!(nested.len(), 5);
    assert!(nested.iter().all(|p| p.required));
    assert_eq!(nested[1].name, "detailed_message");
}

#[test]
fn test_lb_schema_computed_status() {
    let parser = fixture();
    let synthesizer = SchemaSynthesizer::new(parser.document());
    let resources = parser.resources();
    let lb = resources.iter().find(|r| r.name == "lbs").unwrap();

    let schema = synthesizer.synthesize_descriptor(lb).unwrap().schema;
    let status = schema.property("status").unwrap();
    assert!(status.computed);
    assert!(!status.required);
    assert_eq!(
        schema.required_properties().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["name", "backends"]
    );
}

#[test]
fn test_parse_openapi_v3_yaml() {
    let yaml = r##"
openapi: 3.0.1
info:
  title: Widgets
  version: "1.0"
servers:
  - url: http://127.0.0.1:9000/api
components:
  securitySchemes:
    key:
      type: apiKey
      in: header
      name: X-API-Key
  schemas:
    Widget:
      type: object
      properties:
        id:
          type: integer
          readOnly: true
        size:
          type: integer
          x-terraform-force-new: true
paths:
  /widgets:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Widget'
    get: {}
  /widgets/{widget_id}:
    get: {}
    put: {}
    delete: {}
"##;

    let parser = OpenApiParser::from_yaml(yaml).unwrap();
    assert_eq!(parser.version(), SpecVersion::V3);

    let analyser = SpecAnalyser::new(parser.document());
    assert_eq!(analyser.base_url().as_deref(), Some("http://127.0.0.1:9000/api"));
    assert_eq!(analyser.api_key_header(), "X-API-Key");

    let resources = analyser.resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id_parameter, "widget_id");

    let schema = SchemaSynthesizer::new(parser.document())
        .synthesize_descriptor(&resources[0])
        .unwrap()
        .schema;
    assert_eq!(schema.identifier().unwrap().kind, PropertyKind::Integer);
    assert!(schema.property("size").unwrap().force_new);
}
