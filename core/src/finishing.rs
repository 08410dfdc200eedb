#![deny(missing_docs)]

//! # Finishing Passes
//!
//! Post-processing over the assembled document, applied in a fixed order:
//!
//! 1. [`fix_file_types`]: `file` is only legal on form parameters, so
//!    definition properties and response schemas are downgraded to `string`.
//! 2. [`promote_file_operations`]: query operations carrying a file parameter
//!    become multipart `post` operations with `formData` parameters.
//! 3. [`inject_input_hints`]: UI hints keyed on parameter and property names.

use crate::config::BuilderConfig;
use crate::document::SwaggerDocument;
use crate::operations::{action_path, parameter_key};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

static PARAM_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Date\]?$").unwrap());
static PROPERTY_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Date$").unwrap());

const SESSION_START_PATH: &str = "/service/session/action/start";
const EXPIRY_PARAMETER: &str = "expiry";
const DEFAULT_EXPIRY_SECONDS: i64 = 86400;

/// Runs every pass in order.
pub fn finish(doc: &mut SwaggerDocument, config: &BuilderConfig) {
    fix_file_types(doc);
    promote_file_operations(doc);
    inject_input_hints(doc, config);
}

/// Rewrites `type: file` to `type: string` inside a schema, recursively.
fn downgrade_file(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    if obj.get("type").and_then(Value::as_str) == Some("file") {
        obj.insert("type".into(), json!("string"));
    }
    if let Some(items) = obj.get_mut("items") {
        downgrade_file(items);
    }
    if let Some(Value::Object(props)) = obj.get_mut("properties") {
        for prop in props.values_mut() {
            downgrade_file(prop);
        }
    }
}

/// Pass 1: downgrades `file` in definitions and response schemas.
pub fn fix_file_types(doc: &mut SwaggerDocument) {
    for def in doc.definitions.values_mut() {
        downgrade_file(def);
    }
    for path_item in doc.paths.values_mut() {
        let Some(methods) = path_item.as_object_mut() else {
            continue;
        };
        for op in methods.values_mut() {
            if let Some(Value::Object(responses)) = op.get_mut("responses") {
                for response in responses.values_mut() {
                    if let Some(schema) = response.get_mut("schema") {
                        downgrade_file(schema);
                    }
                }
            }
        }
    }
}

/// Pass 2: moves `get` operations with a file parameter to `post`.
///
/// The operation keeps its id. Every file parameter it lists, inline or
/// shared, is sent as `formData`.
pub fn promote_file_operations(doc: &mut SwaggerDocument) {
    let SwaggerDocument {
        paths, parameters, ..
    } = doc;
    for (path, path_item) in paths.iter_mut() {
        let Some(methods) = path_item.as_object_mut() else {
            continue;
        };
        let Some(mut op) = methods.remove("get") else {
            continue;
        };

        let mut has_file = false;
        if let Some(Value::Array(params)) = op.get_mut("parameters") {
            for param in params.iter_mut() {
                let shared_key = param
                    .get("$ref")
                    .and_then(Value::as_str)
                    .and_then(parameter_key)
                    .map(str::to_string);
                let target = match shared_key {
                    Some(key) => match parameters.get_mut(&key) {
                        Some(shared) => shared,
                        None => continue,
                    },
                    None => param,
                };
                if target.get("type").and_then(Value::as_str) == Some("file") {
                    target["in"] = json!("formData");
                    has_file = true;
                }
            }
        }

        if has_file {
            tracing::debug!(path = %path, "promoting file operation to post");
            op["x-requestFormat"] = json!("file");
            methods.insert("post".into(), op);
        } else {
            methods.insert("get".into(), op);
        }
    }
}

/// Endpoint backing a dynamic-enum lookup, and the operation it annotates.
struct LookupSource {
    parameter: String,
    scope: String,
    path: String,
    method: String,
    label: String,
}

fn is_password_name(name: &str) -> bool {
    matches!(name, "password" | "secret")
}

struct Hinter {
    lookups: Vec<LookupSource>,
}

impl Hinter {
    fn new(config: &BuilderConfig, paths: &Map<String, Value>) -> Self {
        let mut lookups = Vec::new();
        for lookup in &config.list_lookups {
            let path = action_path(&lookup.service, "list");
            let method = paths
                .get(&path)
                .and_then(Value::as_object)
                .and_then(|methods| methods.keys().next().cloned());
            if let Some(method) = method {
                lookups.push(LookupSource {
                    parameter: lookup.parameter.clone(),
                    scope: action_path(&lookup.service, &lookup.action),
                    path,
                    method,
                    label: lookup.label.clone(),
                });
            }
        }
        Self { lookups }
    }

    fn apply_lookup(&self, name: &str, path: &str, target: &mut Map<String, Value>) {
        let Some(source) = self
            .lookups
            .iter()
            .find(|l| l.parameter == name && l.scope == path)
        else {
            return;
        };
        target.insert(
            "x-dynamicEnum".into(),
            json!({
                "path": source.path,
                "method": source.method,
                "array": "objects",
                "label": source.label,
                "value": "id",
            }),
        );
        let input = match target.get("type").and_then(Value::as_str) {
            Some("integer") | Some("number") => "number",
            _ => "text",
        };
        target.insert("x-inputType".into(), json!(input));
    }

    fn parameter(&self, param: &mut Value, path: &str) {
        let Some(obj) = param.as_object_mut() else {
            return;
        };
        if obj.contains_key("$ref") {
            return;
        }
        if let Some(Value::Object(schema)) = obj.get_mut("schema") {
            self.schema_properties(schema, path);
            return;
        }
        let Some(name) = obj.get("name").and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        if is_password_name(&name) {
            obj.insert("x-inputType".into(), json!("password"));
        }
        // A date suffix overrides the password hint.
        if PARAM_DATE.is_match(&name) {
            obj.insert("x-inputType".into(), json!("datetime"));
        }
        self.apply_lookup(&name, path, obj);
        if path == SESSION_START_PATH && name == EXPIRY_PARAMETER {
            obj.insert("default".into(), json!(DEFAULT_EXPIRY_SECONDS));
        }
    }

    /// Hints on the properties of a schema, recursing into nested inline
    /// schemas. Only the top level of an operation body sees `path`.
    fn schema_properties(&self, schema: &mut Map<String, Value>, path: &str) {
        if let Some(Value::Object(items)) = schema.get_mut("items") {
            self.schema_properties(items, "");
        }
        let Some(Value::Object(props)) = schema.get_mut("properties") else {
            return;
        };
        for (name, prop) in props.iter_mut() {
            let Some(prop) = prop.as_object_mut() else {
                continue;
            };
            if prop.contains_key("$ref") {
                continue;
            }
            self.apply_lookup(name, path, prop);
            if is_password_name(name) {
                prop.insert("x-inputType".into(), json!("password"));
            } else if PROPERTY_DATE.is_match(name) {
                prop.insert("x-inputType".into(), json!("datetime"));
            } else if path == SESSION_START_PATH && name == EXPIRY_PARAMETER {
                prop.insert("default".into(), json!(DEFAULT_EXPIRY_SECONDS));
            }
            self.schema_properties(prop, "");
        }
    }
}

/// Pass 3: attaches UI hints.
///
/// - Parameters and properties named exactly `password` or `secret` get
///   `x-inputType: password`.
/// - Parameter names ending in `Date` (or `Date]`) and property names
///   ending in `Date` get `x-inputType: datetime`. On a parameter this wins
///   over the password hint.
/// - `expiry` on the session start operation defaults to one day.
/// - A [`crate::config::ListLookup`] adds an `x-dynamicEnum` pointing at the
///   service's `list` operation to the named parameter of the configured
///   action, provided the `list` operation exists.
pub fn inject_input_hints(doc: &mut SwaggerDocument, config: &BuilderConfig) {
    let hinter = Hinter::new(config, &doc.paths);
    tracing::trace!(lookups = hinter.lookups.len(), "injecting input hints");

    for (path, path_item) in doc.paths.iter_mut() {
        let Some(methods) = path_item.as_object_mut() else {
            continue;
        };
        for op in methods.values_mut() {
            if let Some(Value::Array(params)) = op.get_mut("parameters") {
                for param in params.iter_mut() {
                    hinter.parameter(param, path);
                }
            }
        }
    }
    for param in doc.parameters.values_mut() {
        hinter.parameter(param, "");
    }
    for def in doc.definitions.values_mut() {
        if let Some(def) = def.as_object_mut() {
            hinter.schema_properties(def, "");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_with(paths: Value, parameters: Value, definitions: Value) -> SwaggerDocument {
        let mut doc = SwaggerDocument::default();
        doc.paths = paths.as_object().unwrap().clone();
        doc.parameters = parameters.as_object().unwrap().clone();
        doc.definitions = definitions.as_object().unwrap().clone();
        doc
    }

    #[test]
    fn test_file_downgraded_in_definitions_and_responses() {
        let mut doc = doc_with(
            json!({ "/service/a/action/serve": { "post": {
                "responses": { "200": { "description": "Success", "schema": { "type": "file" } } }
            } } }),
            json!({}),
            json!({ "Upload": { "type": "object", "properties": {
                "data": { "type": "file" },
                "parts": { "type": "array", "items": { "type": "file" } }
            } } }),
        );
        fix_file_types(&mut doc);
        assert_eq!(
            doc.definitions["Upload"]["properties"],
            json!({
                "data": { "type": "string" },
                "parts": { "type": "array", "items": { "type": "string" } }
            })
        );
        assert_eq!(
            doc.paths["/service/a/action/serve"]["post"]["responses"]["200"]["schema"],
            json!({ "type": "string" })
        );
    }

    #[test]
    fn test_file_operation_promoted_to_post() {
        let mut doc = doc_with(
            json!({
                "/service/upload/action/add": { "get": {
                    "operationId": "upload.add",
                    "x-requestFormat": "get",
                    "parameters": [
                        { "$ref": "#/parameters/Upload:upload[data]" },
                        { "name": "fileData", "in": "formData", "type": "file" },
                        { "name": "q", "in": "query", "type": "string" },
                    ]
                } },
                "/service/upload/action/list": { "get": { "operationId": "upload.list", "parameters": [] } },
            }),
            json!({ "Upload:upload[data]": { "name": "upload[data]", "in": "query", "type": "file" } }),
            json!({}),
        );
        promote_file_operations(&mut doc);
        let item = doc.paths["/service/upload/action/add"].as_object().unwrap();
        assert!(item.get("get").is_none());
        assert_eq!(item["post"]["operationId"], json!("upload.add"));
        assert_eq!(item["post"]["x-requestFormat"], json!("file"));
        assert_eq!(item["post"]["parameters"][2]["in"], json!("query"));
        assert_eq!(doc.parameters["Upload:upload[data]"]["in"], json!("formData"));
        assert!(doc.paths["/service/upload/action/list"].get("get").is_some());
    }

    #[test]
    fn test_passes_in_order_keep_definition_string_and_param_form_data() {
        let mut doc = doc_with(
            json!({ "/service/upload/action/add": { "get": {
                "parameters": [{ "$ref": "#/parameters/Upload:upload[data]" }],
                "responses": { "200": { "description": "Success" } }
            } } }),
            json!({ "Upload:upload[data]": { "name": "upload[data]", "in": "query", "type": "file" } }),
            json!({ "Upload": { "type": "object", "properties": { "data": { "type": "file" } } } }),
        );
        finish(&mut doc, &BuilderConfig::default());
        assert_eq!(doc.definitions["Upload"]["properties"]["data"]["type"], json!("string"));
        assert_eq!(
            doc.parameters["Upload:upload[data]"],
            json!({ "name": "upload[data]", "in": "formData", "type": "file" })
        );
    }

    #[test]
    fn test_password_and_date_hints() {
        let mut doc = doc_with(
            json!({ "/service/user/action/login": { "post": { "parameters": [
                { "name": "password", "in": "query", "type": "string" },
                { "name": "body", "in": "body", "schema": { "type": "object", "properties": {
                    "secret": { "type": "string" },
                    "adminSecret": { "type": "string" },
                    "createdAtDate": { "type": "integer" }
                } } }
            ] } } }),
            json!({ "Filter:filter[createdAtDate]": { "name": "filter[createdAtDate]", "in": "query", "type": "integer" } }),
            json!({ "User": { "type": "object", "properties": {
                "password": { "type": "string" },
                "startDate": { "type": "integer" },
                "partner": { "$ref": "#/definitions/Partner" }
            } } }),
        );
        inject_input_hints(&mut doc, &BuilderConfig::default());
        let op = &doc.paths["/service/user/action/login"]["post"];
        assert_eq!(op["parameters"][0]["x-inputType"], json!("password"));
        let body = &op["parameters"][1]["schema"]["properties"];
        assert_eq!(body["secret"]["x-inputType"], json!("password"));
        assert!(body["adminSecret"].get("x-inputType").is_none());
        assert_eq!(body["createdAtDate"]["x-inputType"], json!("datetime"));
        assert_eq!(
            doc.parameters["Filter:filter[createdAtDate]"]["x-inputType"],
            json!("datetime")
        );
        assert_eq!(
            doc.definitions["User"]["properties"],
            json!({
                "password": { "type": "string", "x-inputType": "password" },
                "startDate": { "type": "integer", "x-inputType": "datetime" },
                "partner": { "$ref": "#/definitions/Partner" }
            })
        );
    }

    #[test]
    fn test_date_suffix_beats_password_on_parameters() {
        let mut doc = doc_with(
            json!({ "/service/user/action/reset": { "post": { "parameters": [
                { "name": "passwordDate", "in": "query", "type": "integer" },
                { "name": "userPassword", "in": "query", "type": "string" },
            ] } } }),
            json!({}),
            json!({}),
        );
        inject_input_hints(&mut doc, &BuilderConfig::default());
        let params = &doc.paths["/service/user/action/reset"]["post"]["parameters"];
        assert_eq!(params[0]["x-inputType"], json!("datetime"));
        assert!(params[1].get("x-inputType").is_none());
    }

    #[test]
    fn test_session_start_expiry_default() {
        let mut doc = doc_with(
            json!({ "/service/session/action/start": { "post": { "parameters": [
                { "name": "body", "in": "body", "schema": { "type": "object", "properties": {
                    "expiry": { "type": "integer" }
                } } }
            ] } } }),
            json!({}),
            json!({}),
        );
        inject_input_hints(&mut doc, &BuilderConfig::default());
        assert_eq!(
            doc.paths["/service/session/action/start"]["post"]["parameters"][0]["schema"]
                ["properties"]["expiry"]["default"],
            json!(86400)
        );
    }

    #[test]
    fn test_dynamic_enum_requires_list_operation() {
        let paths = json!({
            "/service/media/action/get": { "get": { "parameters": [
                { "name": "entryId", "in": "query", "type": "string" }
            ] } },
        });
        let mut without = doc_with(paths.clone(), json!({}), json!({}));
        inject_input_hints(&mut without, &BuilderConfig::default());
        assert!(without.paths["/service/media/action/get"]["get"]["parameters"][0]
            .get("x-dynamicEnum")
            .is_none());

        let mut with_list = paths;
        with_list["/service/media/action/list"] = json!({ "get": { "parameters": [] } });
        let mut doc = doc_with(with_list, json!({}), json!({}));
        inject_input_hints(&mut doc, &BuilderConfig::default());
        let param = &doc.paths["/service/media/action/get"]["get"]["parameters"][0];
        assert_eq!(
            param["x-dynamicEnum"],
            json!({
                "path": "/service/media/action/list",
                "method": "get",
                "array": "objects",
                "label": "name",
                "value": "id",
            })
        );
        assert_eq!(param["x-inputType"], json!("text"));
    }

    #[test]
    fn test_dynamic_enum_only_on_configured_action() {
        let entry = json!({ "get": { "parameters": [
            { "name": "entryId", "in": "query", "type": "integer" }
        ] } });
        let mut doc = doc_with(
            json!({
                "/service/media/action/list": { "get": { "parameters": [] } },
                "/service/media/action/get": entry.clone(),
                "/service/media/action/delete": entry.clone(),
                "/service/flavor/action/get": entry,
            }),
            json!({}),
            json!({}),
        );
        inject_input_hints(&mut doc, &BuilderConfig::default());
        let hinted = |path: &str| {
            doc.paths[path]["get"]["parameters"][0]
                .get("x-dynamicEnum")
                .is_some()
        };
        assert!(hinted("/service/media/action/get"));
        assert!(!hinted("/service/media/action/delete"));
        assert!(!hinted("/service/flavor/action/get"));
        assert_eq!(
            doc.paths["/service/media/action/get"]["get"]["parameters"][0]["x-inputType"],
            json!("number")
        );
    }
}
