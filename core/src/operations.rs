#![deny(missing_docs)]

//! # Operation Builder
//!
//! One HTTP operation per action.
//!
//! Body style (`post`) mirrors the action parameters in a JSON body schema.
//! Query style (`get`) lists scalar parameters directly and flattens class
//! parameters through the [`ParameterExpander`]; the flattened parameters are
//! returned as shared parameters for the document's `parameters` section.
//! Actions with file parameters always use query style; the finishing pass
//! later promotes them to multipart `post`.

use crate::config::{BuilderConfig, OperationStyle, TargetProfile};
use crate::definitions::{definition_ref, ENVELOPE_DEFINITION};
use crate::enum_catalog::EnumCatalog;
use crate::error::{AppError, AppResult, Diagnostic};
use crate::expander::{parent_path, Expansion, ParameterExpander};
use crate::model::{ActionNode, ErrorNode, ParamNode, RequestConfigParam, ResultNode, ServiceNode};
use crate::schema_index::SchemaIndex;
use crate::text::fix_markdown;
use crate::type_mapper::{PrimitiveType, TypeMapper};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Shared key of the response-format selector.
pub const FORMAT_PARAMETER: &str = "format";
/// Shared key of the client tag.
pub const CLIENT_TAG_PARAMETER: &str = "clientTag";

const PARAMETERS_PREFIX: &str = "#/parameters/";

/// Builds a `{"$ref": "#/parameters/<key>"}` object.
pub fn parameter_ref(key: &str) -> Value {
    json!({ "$ref": format!("{}{}", PARAMETERS_PREFIX, key) })
}

/// Extracts the key from a `#/parameters/<key>` reference.
pub fn parameter_key(reference: &str) -> Option<&str> {
    reference.strip_prefix(PARAMETERS_PREFIX)
}

/// The path of an action.
pub fn action_path(service_id: &str, action_name: &str) -> String {
    format!("/service/{}/action/{}", service_id, action_name)
}

/// Request-wide parameters shared by every operation.
#[derive(Debug, Clone, Default)]
pub struct GlobalParameters {
    session: String,
    entries: Vec<(String, Value)>,
    attached: Vec<String>,
    envelope_properties: Vec<(String, String)>,
}

impl GlobalParameters {
    /// Builds the session key, format selector, client tag, and the schema's
    /// own request configuration.
    ///
    /// Class-typed request configuration entries cannot travel in a query
    /// string; they become optional body properties instead.
    pub fn build<M: TypeMapper>(
        config: &BuilderConfig,
        request_configuration: &[RequestConfigParam],
        index: &SchemaIndex<'_>,
        mapper: &M,
    ) -> AppResult<Self> {
        let session = config.session_parameter.clone();
        let mut entries = vec![
            (
                session.clone(),
                json!({
                    "name": session,
                    "in": "query",
                    "type": "string",
                    "x-global": true,
                }),
            ),
            (
                FORMAT_PARAMETER.to_string(),
                json!({
                    "name": FORMAT_PARAMETER,
                    "enum": [1, 2, 3],
                    "x-enumLabels": ["JSON", "XML", "PHP"],
                    "x-consoleDefault": 1,
                    "description": "The API response format",
                    "in": "query",
                    "type": "integer",
                    "x-global": true,
                }),
            ),
            (
                CLIENT_TAG_PARAMETER.to_string(),
                json!({
                    "name": CLIENT_TAG_PARAMETER,
                    "type": "string",
                    "in": "query",
                    "default": "devkcom",
                    "description": "Use to tag the app or client-lib making calls to the API",
                }),
            ),
        ];
        let mut attached = vec![FORMAT_PARAMETER.to_string(), CLIENT_TAG_PARAMETER.to_string()];
        let mut envelope_properties = Vec::new();

        for param in request_configuration {
            if entries.iter().any(|(key, _)| *key == param.name) {
                continue;
            }
            index.check_type(&param.type_name, "request configuration")?;
            if index.is_reference(&param.type_name) {
                envelope_properties.push((param.name.clone(), param.type_name.clone()));
                continue;
            }
            let ty = mapper.map(&param.type_name)?;
            entries.push((
                param.name.clone(),
                json!({
                    "name": param.name,
                    "in": "query",
                    "type": ty.as_str(),
                    "x-global": true,
                    "x-volatile": param.volatile,
                }),
            ));
            attached.push(param.name.clone());
        }

        Ok(Self {
            session,
            entries,
            attached,
            envelope_properties,
        })
    }

    /// `(key, parameter)` pairs for the document's `parameters` section.
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Name of the session credential parameter.
    pub fn session(&self) -> &str {
        &self.session
    }

    fn attached_refs(&self) -> impl Iterator<Item = Value> + '_ {
        self.attached.iter().map(|key| parameter_ref(key))
    }
}

/// Nested UI grouping of flattened parameters (`x-parameterGroups`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterGroup {
    /// Group path.
    pub name: String,
    /// Shown for root groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema of the object behind a root group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Nested groups.
    #[serde(rename = "subGroups", skip_serializing_if = "Vec::is_empty")]
    pub sub_groups: Vec<ParameterGroup>,
}

impl ParameterGroup {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema: None,
            sub_groups: Vec::new(),
        }
    }
}

fn find_group_mut<'g>(groups: &'g mut [ParameterGroup], name: &str) -> Option<&'g mut ParameterGroup> {
    for group in groups.iter_mut() {
        if group.name == name {
            return Some(group);
        }
        if let Some(found) = find_group_mut(&mut group.sub_groups, name) {
            return Some(found);
        }
    }
    None
}

/// Adds `name` under its parent path, creating missing ancestors.
fn ensure_group(groups: &mut Vec<ParameterGroup>, name: &str) {
    if find_group_mut(groups, name).is_some() {
        return;
    }
    match parent_path(name) {
        Some(parent) => {
            ensure_group(groups, parent);
            if let Some(parent_group) = find_group_mut(groups, parent) {
                parent_group.sub_groups.push(ParameterGroup::named(name));
            }
        }
        None => groups.push(ParameterGroup::named(name)),
    }
}

/// A generated operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltOperation {
    /// Path key.
    pub path: String,
    /// Method key (`get` / `post`).
    pub method: &'static str,
    /// Operation object.
    pub operation: Value,
    /// Shared parameters the operation references.
    pub shared: Vec<(String, Value)>,
}

/// Builds operations; caches class expansions across actions.
pub struct OperationBuilder<'a, M: TypeMapper> {
    config: &'a BuilderConfig,
    index: &'a SchemaIndex<'a>,
    enums: &'a EnumCatalog,
    expander: &'a ParameterExpander<'a>,
    mapper: &'a M,
    errors: &'a [ErrorNode],
    globals: &'a GlobalParameters,
    expansions: HashMap<String, Expansion>,
}

impl<'a, M: TypeMapper> OperationBuilder<'a, M> {
    /// Creates a builder.
    pub fn new(
        config: &'a BuilderConfig,
        index: &'a SchemaIndex<'a>,
        enums: &'a EnumCatalog,
        expander: &'a ParameterExpander<'a>,
        mapper: &'a M,
        errors: &'a [ErrorNode],
        globals: &'a GlobalParameters,
    ) -> Self {
        Self {
            config,
            index,
            enums,
            expander,
            mapper,
            errors,
            globals,
            expansions: HashMap::new(),
        }
    }

    /// Style an action is generated in.
    pub fn style_for(&self, action: &ActionNode) -> OperationStyle {
        if action.has_file_param() {
            OperationStyle::Query
        } else {
            self.config.operation_style
        }
    }

    /// Builds the operation of one action.
    pub fn build(
        &mut self,
        service: &ServiceNode,
        action: &ActionNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<BuiltOperation> {
        let style = self.style_for(action);
        let mut op = Map::new();
        if let Some(desc) = fix_markdown(action.description.as_deref()) {
            op.insert("description".into(), json!(desc));
        }
        op.insert("tags".into(), json!([service.name]));
        op.insert(
            "operationId".into(),
            json!(format!("{}.{}", service.name, action.name)),
        );
        if action.deprecated {
            op.insert("deprecated".into(), json!(true));
        }
        if action.beta {
            op.insert("x-beta".into(), json!(true));
        }
        op.insert("x-requestFormat".into(), json!(style.method()));
        op.insert(
            "x-actionParameters".into(),
            json!(action.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()),
        );

        let mut shared = Vec::new();
        let parameters = match style {
            OperationStyle::Body => self.body_parameters(action, diagnostics)?,
            OperationStyle::Query => {
                let (params, groups) = self.query_parameters(action, &mut shared, diagnostics)?;
                if !groups.is_empty() {
                    op.insert("x-parameterGroups".into(), serde_json::to_value(groups)?);
                }
                params
            }
        };
        op.insert("parameters".into(), Value::Array(parameters));
        if !action.session_required {
            op.insert("security".into(), json!([]));
        }
        op.insert(
            "responses".into(),
            self.responses(service, action, diagnostics)?,
        );

        Ok(BuiltOperation {
            path: action_path(&service.id, &action.name),
            method: style.method(),
            operation: Value::Object(op),
            shared,
        })
    }

    fn session_ref(&self, action: &ActionNode) -> Option<Value> {
        action
            .session_required
            .then(|| parameter_ref(self.globals.session()))
    }

    fn body_parameters(
        &self,
        action: &ActionNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<Vec<Value>> {
        let enveloped = self.config.profile == TargetProfile::Enveloped;
        let mut params = Vec::new();
        if !enveloped {
            params.extend(self.session_ref(action));
        }
        params.extend(self.globals.attached_refs());

        if action.params.is_empty() {
            return Ok(params);
        }

        let mut properties = Map::new();
        for param in &action.params {
            properties.insert(
                param.name.clone(),
                self.body_property(action, param, diagnostics)?,
            );
        }
        for (name, class) in &self.globals.envelope_properties {
            if !properties.contains_key(name) {
                properties.insert(name.clone(), definition_ref(class));
            }
        }
        let required = action
            .params
            .iter()
            .filter(|p| !p.optional)
            .map(|p| p.name.clone())
            .collect::<Vec<_>>();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        if enveloped {
            schema.insert("allOf".into(), json!([definition_ref(ENVELOPE_DEFINITION)]));
        }
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }

        params.push(json!({
            "name": "body",
            "in": "body",
            "schema": Value::Object(schema),
        }));
        Ok(params)
    }

    fn body_property(
        &self,
        action: &ActionNode,
        param: &ParamNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<Value> {
        let context = format!("{}({})", action.name, param.name);
        self.index.check_type(&param.type_name, &context)?;
        if self.index.is_reference(&param.type_name) {
            return Ok(definition_ref(&param.type_name));
        }

        let ty = self.mapper.map(&param.type_name)?;
        let mut out = Map::new();
        out.insert("type".into(), json!(ty.as_str()));
        if ty == PrimitiveType::Array {
            if let Some(element) = param.array_type.as_deref() {
                out.insert("items".into(), self.element_schema(element, &context)?);
            }
        }
        if let Some(default) = self
            .mapper
            .parse_default(param.default.as_deref(), ty, &context)?
        {
            out.insert("default".into(), default);
        }
        if let Some(enum_name) = param.enum_type.as_deref() {
            self.apply_enum(enum_name, &context, &mut out, diagnostics);
        }
        if let Some(desc) = fix_markdown(param.description.as_deref()) {
            out.insert("description".into(), json!(desc));
        }
        Ok(Value::Object(out))
    }

    fn element_schema(&self, element: &str, context: &str) -> AppResult<Value> {
        self.index.check_type(element, context)?;
        if self.index.is_reference(element) {
            Ok(definition_ref(element))
        } else {
            Ok(json!({ "type": self.mapper.map(element)?.value_type().as_str() }))
        }
    }

    fn expansion(
        &mut self,
        class_name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<&Expansion> {
        if !self.expansions.contains_key(class_name) {
            let expansion = self.expander.expand(class_name)?;
            for path in &expansion.truncated {
                Diagnostic::Truncated {
                    root: class_name.to_string(),
                    path: path.clone(),
                }
                .emit(diagnostics);
            }
            self.expansions.insert(class_name.to_string(), expansion);
        }
        self.expansions
            .get(class_name)
            .ok_or_else(|| AppError::General(format!("Expansion of '{}' missing", class_name)))
    }

    fn query_parameters(
        &mut self,
        action: &ActionNode,
        shared: &mut Vec<(String, Value)>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<(Vec<Value>, Vec<ParameterGroup>)> {
        let mut params = Vec::new();
        params.extend(self.session_ref(action));
        params.extend(self.globals.attached_refs());
        let mut groups: Vec<ParameterGroup> = Vec::new();

        for param in &action.params {
            let context = format!("{}({})", action.name, param.name);
            self.index.check_type(&param.type_name, &context)?;

            if self.index.is_reference(&param.type_name) {
                let mut root_group = ParameterGroup::named(param.name.clone());
                root_group.description = Some(format!("Object Type: `{}`", param.type_name));
                root_group.schema = Some(definition_ref(&param.type_name));
                groups.push(root_group);

                let flattened = self
                    .expansion(&param.type_name, diagnostics)?
                    .params
                    .iter()
                    .map(|flat| flat.qualified(&param.name))
                    .collect::<Vec<_>>();
                for flat in flattened {
                    if let Some(group) = flat.group.as_deref() {
                        ensure_group(&mut groups, group);
                    }
                    let key = format!("{}:{}", param.type_name, flat.name);
                    params.push(parameter_ref(&key));
                    shared.push((key, flat.to_value()));
                }
                continue;
            }

            let ty = self.mapper.map(&param.type_name)?;
            if ty == PrimitiveType::Array {
                continue;
            }
            params.push(self.scalar_parameter(param, ty, &context, diagnostics)?);
        }
        Ok((params, groups))
    }

    fn scalar_parameter(
        &self,
        param: &ParamNode,
        ty: PrimitiveType,
        context: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<Value> {
        let mut out = Map::new();
        out.insert("name".into(), json!(param.name));
        out.insert(
            "in".into(),
            json!(if ty == PrimitiveType::File { "formData" } else { "query" }),
        );
        let mut description = fix_markdown(param.description.as_deref());
        out.insert("type".into(), json!(ty.as_str()));
        out.insert("required".into(), json!(!param.optional));
        if let Some(default) = self
            .mapper
            .parse_default(param.default.as_deref(), ty, context)?
        {
            out.insert("default".into(), default);
        }
        if let Some(enum_name) = param.enum_type.as_deref() {
            if self.apply_enum(enum_name, context, &mut out, diagnostics) {
                let note = format!("Enum Type: `{}`", enum_name);
                description = Some(match description {
                    Some(desc) => format!("{}\n\n{}", note, desc),
                    None => note,
                });
            }
        }
        if let Some(desc) = description {
            out.insert("description".into(), json!(desc));
        }
        Ok(Value::Object(out))
    }

    /// Writes the enum metadata; reports and returns `false` for an unknown enum.
    fn apply_enum(
        &self,
        enum_name: &str,
        context: &str,
        target: &mut Map<String, Value>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        match self.enums.values_for(enum_name) {
            Some(values) => {
                values.apply_to(target);
                true
            }
            None => {
                Diagnostic::LookupMiss {
                    what: "enum",
                    name: enum_name.to_string(),
                    context: context.to_string(),
                }
                .emit(diagnostics);
                false
            }
        }
    }

    fn response_schema(&self, type_name: &str, array_type: Option<&str>, context: &str) -> AppResult<Value> {
        self.index.check_type(type_name, context)?;
        if self.index.is_reference(type_name) {
            return Ok(definition_ref(type_name));
        }
        let ty = self.mapper.map(type_name)?.value_type();
        let mut out = Map::new();
        out.insert("type".into(), json!(ty.as_str()));
        if ty == PrimitiveType::Array {
            if let Some(element) = array_type {
                out.insert("items".into(), self.response_schema(element, None, context)?);
            }
        }
        Ok(Value::Object(out))
    }

    fn responses(
        &self,
        service: &ServiceNode,
        action: &ActionNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<Value> {
        let context = format!("{}.{}", service.name, action.name);
        let mut success = Map::new();
        success.insert("description".into(), json!("Success"));
        if let Some(ResultNode { type_name, array_type }) = &action.result {
            if !type_name.is_empty() {
                success.insert(
                    "schema".into(),
                    self.response_schema(type_name, array_type.as_deref(), &context)?,
                );
            }
        }

        let mut responses = Map::new();
        responses.insert("200".into(), Value::Object(success));
        if !action.throws.is_empty() {
            let lines = action
                .throws
                .iter()
                .map(|name| {
                    let found = self.errors.iter().find(|e| e.name == *name);
                    match found.and_then(ErrorNode::display_message) {
                        Some(message) => format!("* `{}`: {}", name, message),
                        None => {
                            if found.is_none() {
                                Diagnostic::LookupMiss {
                                    what: "error",
                                    name: name.clone(),
                                    context: context.clone(),
                                }
                                .emit(diagnostics);
                            }
                            format!("* `{}`", name)
                        }
                    }
                })
                .collect::<Vec<_>>();
            responses.insert("x-errors".into(), json!({ "description": lines.join("\n") }));
        }
        Ok(Value::Object(responses))
    }
}
