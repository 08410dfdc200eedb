#![deny(missing_docs)]

//! # Document Assembly
//!
//! Runs the compilation phases in order and collects the Swagger 2.0 document.
//!
//! ```text
//! header -> global parameters -> enums -> definitions -> paths -> tags
//!        -> errors -> finishing passes
//! ```

use crate::config::{BuilderConfig, TargetProfile};
use crate::definitions::{definition_name, envelope_definition, DefinitionBuilder, ENVELOPE_DEFINITION};
use crate::enum_catalog::EnumCatalog;
use crate::error::{AppError, AppResult, Diagnostic};
use crate::expander::ParameterExpander;
use crate::finishing;
use crate::model::ApiSchema;
use crate::operations::{parameter_key, GlobalParameters, OperationBuilder};
use crate::schema_index::SchemaIndex;
use crate::text::fix_markdown;
use crate::type_mapper::{RpcTypeMapper, TypeMapper};
use serde_json::{json, Map, Value};

/// Swagger version emitted.
pub const SWAGGER_VERSION: &str = "2.0";

/// The assembled document.
///
/// Sections are kept apart until [`SwaggerDocument::to_value`] so the
/// finishing passes can address them directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwaggerDocument {
    /// `swagger`, `schemes`, `host`, `basePath`, `info`, `produces` and security.
    pub header: Map<String, Value>,
    /// Shared parameters keyed by name (`parameters`).
    pub parameters: Map<String, Value>,
    /// Enumeration catalog (`x-enums`).
    pub enums: Value,
    /// Class definitions (`definitions`).
    pub definitions: Map<String, Value>,
    /// Operations keyed by path then method (`paths`).
    pub paths: Map<String, Value>,
    /// One tag per service, sorted case-insensitively.
    pub tags: Vec<Value>,
    /// Error catalog (`x-errors`).
    pub errors: Vec<Value>,
    diagnostics: Vec<Diagnostic>,
}

impl SwaggerDocument {
    /// Non-fatal problems met while building.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Looks up an operation.
    pub fn operation(&self, path: &str, method: &str) -> Option<&Value> {
        self.paths.get(path).and_then(|item| item.get(method))
    }

    /// Renders the full document.
    pub fn to_value(&self) -> Value {
        let mut out = self.header.clone();
        out.insert("parameters".into(), Value::Object(self.parameters.clone()));
        out.insert("x-enums".into(), self.enums.clone());
        out.insert("definitions".into(), Value::Object(self.definitions.clone()));
        out.insert("paths".into(), Value::Object(self.paths.clone()));
        out.insert("tags".into(), Value::Array(self.tags.clone()));
        out.insert("x-errors".into(), Value::Array(self.errors.clone()));
        Value::Object(out)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Every `$ref` that does not resolve inside the document.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        collect_refs(&self.to_value(), &mut refs);
        refs.into_iter()
            .filter(|r| {
                if let Some(name) = definition_name(r) {
                    !self.definitions.contains_key(name)
                } else if let Some(key) = parameter_key(r) {
                    !self.parameters.contains_key(key)
                } else {
                    true
                }
            })
            .collect()
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(r)) => out.push(r.clone()),
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

/// Compiles an [`ApiSchema`] into a [`SwaggerDocument`].
pub struct SwaggerBuilder<M: TypeMapper = RpcTypeMapper> {
    config: BuilderConfig,
    mapper: M,
}

impl SwaggerBuilder<RpcTypeMapper> {
    /// Creates a builder with the standard type mapping.
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            mapper: RpcTypeMapper,
        }
    }
}

impl<M: TypeMapper> SwaggerBuilder<M> {
    /// Creates a builder with a custom type mapping.
    pub fn with_mapper(config: BuilderConfig, mapper: M) -> Self {
        Self { config, mapper }
    }

    /// The active configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Runs every phase. Fatal conditions abort; lookup misses and
    /// truncations are logged and kept on the document.
    pub fn run(&self, schema: &ApiSchema) -> AppResult<SwaggerDocument> {
        let config = &self.config;
        let mut doc = SwaggerDocument {
            header: self.header(&schema.api_version),
            ..Default::default()
        };
        let mut diagnostics = Vec::new();

        let index = SchemaIndex::build(&schema.classes, &config.root_class)?;

        let globals =
            GlobalParameters::build(config, &schema.request_configuration, &index, &self.mapper)?;
        for (key, param) in globals.entries() {
            doc.parameters.insert(key.clone(), param.clone());
        }

        let enums = EnumCatalog::build(&schema.enums)?;
        doc.enums = enums.to_value();

        let definitions =
            DefinitionBuilder::new(&index, &enums, &self.mapper).build(&mut diagnostics)?;
        doc.definitions = definitions.to_value();
        if config.profile == TargetProfile::Enveloped {
            if doc.definitions.contains_key(ENVELOPE_DEFINITION) {
                return Err(AppError::malformed(format!(
                    "Class '{}' collides with the envelope definition",
                    ENVELOPE_DEFINITION
                )));
            }
            doc.definitions.insert(
                ENVELOPE_DEFINITION.into(),
                envelope_definition(&config.session_parameter, &schema.api_version),
            );
        }

        let expander =
            ParameterExpander::new(&index, &definitions, &enums, config.max_query_depth);
        let mut operations = OperationBuilder::new(
            config,
            &index,
            &enums,
            &expander,
            &self.mapper,
            &schema.errors,
            &globals,
        );
        for service in &schema.services {
            if config.is_excluded(&service.name) {
                tracing::debug!(service = %service.name, "skipping excluded service");
                continue;
            }
            for action in &service.actions {
                let built = operations.build(service, action, &mut diagnostics)?;
                tracing::debug!(path = %built.path, method = built.method, "generated operation");
                for (key, param) in built.shared {
                    doc.parameters.insert(key, param);
                }
                let item = doc
                    .paths
                    .entry(built.path)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(methods) = item {
                    methods.insert(built.method.into(), built.operation);
                }
            }
        }

        let mut tags = schema
            .services
            .iter()
            .map(|service| {
                let mut tag = Map::new();
                tag.insert("name".into(), json!(service.name));
                if let Some(desc) = fix_markdown(service.description.as_deref()) {
                    tag.insert("description".into(), json!(desc));
                }
                if let Some(plugin) = &service.plugin {
                    tag.insert("x-plugin".into(), json!(plugin));
                }
                (service.name.to_lowercase(), Value::Object(tag))
            })
            .collect::<Vec<_>>();
        tags.sort_by(|a, b| a.0.cmp(&b.0));
        doc.tags = tags.into_iter().map(|(_, tag)| tag).collect();

        doc.errors = schema
            .errors
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;

        finishing::finish(&mut doc, config);
        doc.diagnostics = diagnostics;

        tracing::info!(
            paths = doc.paths.len(),
            definitions = doc.definitions.len(),
            parameters = doc.parameters.len(),
            enums = enums.len(),
            diagnostics = doc.diagnostics.len(),
            "built swagger document"
        );
        Ok(doc)
    }

    fn header(&self, api_version: &str) -> Map<String, Value> {
        let config = &self.config;
        let connection = config.connection_info();
        let session = &config.session_parameter;
        let mut header = Map::new();
        header.insert("swagger".into(), json!(SWAGGER_VERSION));
        header.insert("schemes".into(), json!(["https"]));
        header.insert("host".into(), json!(connection.host));
        header.insert("basePath".into(), json!(connection.base_path));
        header.insert(
            "info".into(),
            json!({
                "title": connection.title,
                "description": connection.description,
                "version": api_version,
            }),
        );
        header.insert("produces".into(), json!(["application/json", "text/xml"]));

        let scheme = match config.profile {
            TargetProfile::Standard => json!({
                "in": "query",
                "name": session,
                "type": "apiKey",
                "description": "Session credential issued by the session service",
            }),
            TargetProfile::Enveloped => json!({
                "in": "body",
                "name": session,
                "type": "apiKey",
                "description": "Session credential carried in the request envelope",
            }),
        };
        let mut security = Map::new();
        security.insert(session.clone(), json!([]));
        header.insert("security".into(), json!([security]));
        let mut definitions = Map::new();
        definitions.insert(session.clone(), scheme);
        header.insert("securityDefinitions".into(), Value::Object(definitions));
        header
    }
}

/// Compiles `schema` with the standard type mapping.
pub fn build_document(schema: &ApiSchema, config: BuilderConfig) -> AppResult<SwaggerDocument> {
    SwaggerBuilder::new(config).run(schema)
}
