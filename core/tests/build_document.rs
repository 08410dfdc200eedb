use cdd_rpc_core::expander::bracket_depth;
use cdd_rpc_core::{
    build_document, ApiSchema, BuilderConfig, Diagnostic, OperationStyle, SwaggerDocument,
    TargetProfile,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const SCHEMA: &str = r#"
apiVersion: 16.1.0
classes:
  - name: Base
    abstract: true
    base: ObjectBase
    description: "Common fields\n\t  of every object"
    properties:
      - { name: id, type: string, readOnly: true }
      - { name: name, type: string }
      - { name: createdAtDate, type: int, readOnly: true }
  - name: Foo
    base: Base
    properties:
      - { name: fooField, type: string }
  - name: Bar
    base: Base
    properties:
      - { name: barField, type: int, enumType: Status }
  - name: BaseFilter
    properties:
      - { name: idEqual, type: string }
      - { name: orderBy, type: string }
  - name: FooFilter
    base: BaseFilter
    properties:
      - { name: fooFieldEqual, type: string }
  - name: Pager
    properties:
      - { name: pageSize, type: int, default: "30" }
  - name: Upload
    properties:
      - { name: data, type: file }
      - { name: title, type: string }
  - name: Node
    properties:
      - { name: value, type: string }
      - { name: child, type: Node }
  - name: User
    properties:
      - { name: password, type: string, writeOnly: true }
enums:
  - name: Status
    enumType: int
    constants:
      - { name: ACTIVE, value: "1" }
      - { name: ENABLED, value: "1" }
      - { name: DELETED, value: "2" }
  - name: BaseOrderBy
    enumType: string
    constants:
      - { name: NAME_ASC, value: "+name" }
      - { name: NAME_DESC, value: "-name" }
services:
  - id: base
    name: base
    description: Generic objects
    actions:
      - name: get
        params:
          - { name: id, type: string }
        result: { type: Base }
        throws: [NOT_FOUND]
      - name: list
        params:
          - { name: filter, type: BaseFilter, optional: true }
          - { name: pager, type: Pager, optional: true }
        result: { type: array, arrayType: Base }
      - name: count
        deprecated: true
        beta: true
        result: { type: int }
  - id: upload
    name: Upload
    actions:
      - name: add
        params:
          - { name: upload, type: Upload }
          - { name: fileData, type: file }
        result: { type: Upload }
  - id: user
    name: user
    actions:
      - name: login
        sessionRequired: false
        params:
          - { name: password, type: string }
        result: { type: string }
  - id: node
    name: node
    actions:
      - name: walk
        params:
          - { name: node, type: Node }
  - id: document
    name: document
    actions:
      - name: list
  - id: session
    name: session
    actions:
      - name: start
        params:
          - { name: expiry, type: int, optional: true }
        result: { type: string }
  - id: media
    name: media
    plugin: media
    actions:
      - name: list
      - name: get
        params:
          - { name: entryId, type: string }
errors:
  - { name: NOT_FOUND, code: "404", message: "Object not found" }
requestConfiguration:
  - { name: partnerId, type: int }
"#;

fn schema() -> ApiSchema {
    ApiSchema::from_yaml_str(SCHEMA).unwrap()
}

fn build(config: BuilderConfig) -> SwaggerDocument {
    build_document(&schema(), config).unwrap()
}

fn params_of<'a>(doc: &'a SwaggerDocument, path: &str, method: &str) -> &'a Vec<Value> {
    doc.operation(path, method).unwrap()["parameters"]
        .as_array()
        .unwrap()
}

#[test]
fn test_discriminator_lists_concrete_descendants() {
    let doc = build(BuilderConfig::default());
    let base = &doc.definitions["Base"];
    assert_eq!(base["properties"]["objectType"]["enum"], json!(["Foo", "Bar"]));
    assert_eq!(
        base["anyOf"],
        json!([{ "$ref": "#/definitions/Foo" }, { "$ref": "#/definitions/Bar" }])
    );
    assert_eq!(base["x-abstract"], json!(true));
    assert_eq!(
        doc.definitions["Foo"]["allOf"],
        json!([{ "$ref": "#/definitions/Base" }])
    );
}

#[test]
fn test_action_without_params_has_no_body() {
    let doc = build(BuilderConfig::default());
    let params = params_of(&doc, "/service/base/action/count", "post");
    assert!(params.iter().all(|p| p.get("in") != Some(&json!("body"))));
    assert_eq!(
        doc.operation("/service/base/action/count", "post").unwrap()["responses"]["200"],
        json!({ "description": "Success", "schema": { "type": "integer" } })
    );
}

#[test]
fn test_deprecated_and_beta_actions_are_flagged() {
    let doc = build(BuilderConfig::default());
    let count = doc.operation("/service/base/action/count", "post").unwrap();
    assert_eq!(count["deprecated"], json!(true));
    assert_eq!(count["x-beta"], json!(true));

    let get = doc.operation("/service/base/action/get", "post").unwrap();
    assert!(get.get("deprecated").is_none());
    assert!(get.get("x-beta").is_none());
}

#[test]
fn test_file_upload_becomes_multipart_post() {
    let doc = build(BuilderConfig::default());
    assert!(doc.operation("/service/upload/action/add", "get").is_none());
    let op = doc.operation("/service/upload/action/add", "post").unwrap();
    assert_eq!(op["x-requestFormat"], json!("file"));
    assert_eq!(op["operationId"], json!("Upload.add"));

    let params = params_of(&doc, "/service/upload/action/add", "post");
    let file = params.iter().find(|p| p["name"] == json!("fileData")).unwrap();
    assert_eq!(file["in"], json!("formData"));
    for param in params {
        let resolved = match param.get("$ref").and_then(Value::as_str) {
            Some(r) => &doc.parameters[r.trim_start_matches("#/parameters/")],
            None => param,
        };
        if resolved["type"] == json!("file") {
            assert_eq!(resolved["in"], json!("formData"));
        }
    }
}

#[test]
fn test_file_property_reads_string_while_shared_param_is_form_data() {
    let doc = build(BuilderConfig::default());
    assert_eq!(
        doc.definitions["Upload"]["properties"]["data"]["type"],
        json!("string")
    );
    assert_eq!(
        doc.parameters["Upload:upload[data]"],
        json!({
            "name": "upload[data]",
            "in": "formData",
            "type": "file",
            "x-group": "upload",
        })
    );
}

#[test]
fn test_password_hint_keeps_type() {
    let doc = build(BuilderConfig::default());
    let user = &doc.definitions["User"]["properties"]["password"];
    assert_eq!(user["type"], json!("string"));
    assert_eq!(user["x-inputType"], json!("password"));

    let params = params_of(&doc, "/service/user/action/login", "post");
    let body = params.iter().find(|p| p["in"] == json!("body")).unwrap();
    assert_eq!(
        body["schema"]["properties"]["password"],
        json!({ "type": "string", "x-inputType": "password" })
    );
    assert_eq!(
        doc.operation("/service/user/action/login", "post").unwrap()["security"],
        json!([])
    );
}

#[test]
fn test_duplicate_enum_values_collapse() {
    let doc = build(BuilderConfig::default());
    let bar = &doc.definitions["Bar"]["properties"]["barField"];
    assert_eq!(bar["enum"], json!([1, 2]));
    assert_eq!(bar["x-enumLabels"], json!(["ACTIVE", "DELETED"]));
    assert_eq!(bar["x-enumType"], json!("Status"));
    assert_eq!(
        doc.enums["Status"]["oneOf"],
        json!([
            { "title": "ACTIVE", "enum": [1] },
            { "title": "DELETED", "enum": [2] },
        ])
    );
}

#[test]
fn test_output_is_deterministic() {
    let first = build(BuilderConfig::default()).to_json_string().unwrap();
    let second = build(BuilderConfig::default()).to_json_string().unwrap();
    assert_eq!(first, second);

    let query = BuilderConfig::default().with_operation_style(OperationStyle::Query);
    assert_eq!(
        build(query.clone()).to_json_string().unwrap(),
        build(query).to_json_string().unwrap()
    );
}

#[test]
fn test_every_reference_resolves() {
    let configs = vec![
        BuilderConfig::default(),
        BuilderConfig::default().with_operation_style(OperationStyle::Query),
        BuilderConfig::default().with_profile(TargetProfile::Enveloped),
        BuilderConfig::default()
            .with_profile(TargetProfile::Enveloped)
            .with_operation_style(OperationStyle::Query),
    ];
    for config in configs {
        let doc = build(config);
        assert_eq!(doc.dangling_references(), Vec::<String>::new());
    }
}

#[test]
fn test_expansion_depth_is_bounded() {
    let doc = build(
        BuilderConfig::default()
            .with_operation_style(OperationStyle::Query)
            .with_max_query_depth(2),
    );
    let node_params = doc
        .parameters
        .iter()
        .filter(|(key, _)| key.starts_with("Node:"))
        .map(|(_, p)| p["name"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(node_params, vec!["node[value]", "node[child][value]"]);
    assert!(node_params.iter().all(|name| bracket_depth(name) <= 2));
    assert!(doc
        .diagnostics()
        .iter()
        .any(|d| matches!(d, Diagnostic::Truncated { root, .. } if root == "Node")));
}

#[test]
fn test_query_style_flattens_polymorphic_filter() {
    let doc = build(BuilderConfig::default().with_operation_style(OperationStyle::Query));
    let op = doc.operation("/service/base/action/list", "get").unwrap();
    assert_eq!(op["x-requestFormat"], json!("get"));

    assert_eq!(
        doc.parameters["BaseFilter:filter[objectType]"]["enum"],
        json!(["BaseFilter", "FooFilter"])
    );
    assert_eq!(
        doc.parameters["BaseFilter:filter[orderBy]"]["enum"],
        json!(["+name", "-name"])
    );
    assert!(doc.parameters["BaseFilter:filter[idEqual]"]
        .get("x-showCondition")
        .is_none());
    assert_eq!(
        doc.parameters["BaseFilter:filter[fooFieldEqual]"]["x-showCondition"],
        json!({ "name": "filter[objectType]", "value": ["FooFilter"] })
    );

    let groups = op["x-parameterGroups"].as_array().unwrap();
    let names = groups.iter().map(|g| g["name"].clone()).collect::<Vec<_>>();
    assert_eq!(names, vec![json!("filter"), json!("pager")]);
    assert_eq!(groups[0]["description"], json!("Object Type: `BaseFilter`"));

    let refs = params_of(&doc, "/service/base/action/list", "get")
        .iter()
        .filter_map(|p| p["$ref"].as_str())
        .collect::<Vec<_>>();
    assert!(refs.contains(&"#/parameters/ks"));
    assert!(refs.contains(&"#/parameters/partnerId"));
    assert!(refs.contains(&"#/parameters/Pager:pager[pageSize]"));
}

#[test]
fn test_tags_sorted_case_insensitively() {
    let doc = build(BuilderConfig::default());
    let names = doc
        .tags
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["base", "document", "media", "node", "session", "Upload", "user"]
    );
    let media = doc.tags.iter().find(|t| t["name"] == json!("media")).unwrap();
    assert_eq!(media["x-plugin"], json!("media"));
}

#[test]
fn test_excluded_service_has_no_paths() {
    let doc = build(BuilderConfig::default());
    assert!(!doc.paths.contains_key("/service/document/action/list"));
    let doc = build(BuilderConfig::default().with_excluded_services(Vec::<String>::new()));
    assert!(doc.paths.contains_key("/service/document/action/list"));
}

#[test]
fn test_enveloped_profile() {
    let doc = build(BuilderConfig::default().with_profile(TargetProfile::Enveloped));
    assert_eq!(
        doc.definitions["RequestEnvelope"]["properties"]["apiVersion"]["default"],
        json!("16.1.0")
    );
    let params = params_of(&doc, "/service/base/action/get", "post");
    assert!(!params.contains(&json!({ "$ref": "#/parameters/ks" })));
    let body = params.iter().find(|p| p["in"] == json!("body")).unwrap();
    assert_eq!(
        body["schema"]["allOf"],
        json!([{ "$ref": "#/definitions/RequestEnvelope" }])
    );
}

#[test]
fn test_errors_and_hints() {
    let doc = build(BuilderConfig::default());
    let get = doc.operation("/service/base/action/get", "post").unwrap();
    assert_eq!(
        get["responses"]["x-errors"],
        json!({ "description": "* `NOT_FOUND`: Object not found" })
    );
    assert_eq!(
        doc.errors,
        vec![json!({ "name": "NOT_FOUND", "code": "404", "message": "Object not found" })]
    );

    let start = params_of(&doc, "/service/session/action/start", "post");
    let body = start.iter().find(|p| p["in"] == json!("body")).unwrap();
    assert_eq!(body["schema"]["properties"]["expiry"]["default"], json!(86400));

    let media = params_of(&doc, "/service/media/action/get", "post");
    let body = media.iter().find(|p| p["in"] == json!("body")).unwrap();
    assert_eq!(
        body["schema"]["properties"]["entryId"]["x-dynamicEnum"]["path"],
        json!("/service/media/action/list")
    );
    assert_eq!(
        body["schema"]["properties"]["entryId"]["x-dynamicEnum"]["method"],
        json!("post")
    );
}

#[test]
fn test_malformed_schema_is_fatal() {
    let mut schema = schema();
    schema.classes[1].base = Some("Missing".into());
    let err = build_document(&schema, BuilderConfig::default()).unwrap_err();
    assert!(matches!(err, cdd_rpc_core::AppError::MalformedSchema(_)));
}

#[test]
fn test_class_description_is_cleaned() {
    let doc = build(BuilderConfig::default());
    let desc = doc.definitions["Base"]["description"].as_str().unwrap();
    assert!(desc.ends_with("Common fields\n\nof every object"));
}

#[test]
fn test_only_abstract_subclasses_leave_a_diagnostic() {
    let schema = ApiSchema::from_yaml_str(
        r#"
apiVersion: 1.0.0
classes:
  - { name: Shape, abstract: true, properties: [{ name: area, type: float }] }
  - { name: Polygon, abstract: true, base: Shape }
services:
  - id: shape
    name: shape
    actions:
      - name: get
        result: { type: Shape }
"#,
    )
    .unwrap();
    let doc = build_document(&schema, BuilderConfig::default()).unwrap();

    assert!(doc.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::LookupMiss { what: "concrete subclass", name, .. } if name == "Shape"
    )));
    assert!(doc.definitions["Shape"].get("discriminator").is_none());
    assert!(doc.definitions["Shape"].get("anyOf").is_none());
}
