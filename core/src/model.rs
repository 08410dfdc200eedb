#![deny(missing_docs)]

//! # Input Model
//!
//! The fully materialized RPC schema tree the compiler consumes.
//!
//! Every struct derives `Deserialize` with camelCase keys so a normalized tree
//! can be loaded from JSON or YAML. Fetching and parsing the raw vendor schema
//! into this shape happens outside this crate.

use crate::error::AppResult;
use serde::{Deserialize, Serialize};

/// Root of the input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSchema {
    /// API version, copied to `info.version`.
    pub api_version: String,
    /// All classes, in declaration order.
    #[serde(default)]
    pub classes: Vec<ClassNode>,
    /// All enumerations, in declaration order.
    #[serde(default)]
    pub enums: Vec<EnumNode>,
    /// All services, in declaration order.
    #[serde(default)]
    pub services: Vec<ServiceNode>,
    /// Global error catalog.
    #[serde(default)]
    pub errors: Vec<ErrorNode>,
    /// Request-wide parameters accepted by every action.
    #[serde(default)]
    pub request_configuration: Vec<RequestConfigParam>,
}

impl ApiSchema {
    /// Loads a normalized tree from a JSON string.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a normalized tree from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// A class: a named, single-inheritance record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassNode {
    /// Class name (also the definition key).
    pub name: String,
    /// Base class name, if any.
    #[serde(default)]
    pub base: Option<String>,
    /// Abstract classes are never valid discriminator values.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared (own) properties, in order.
    #[serde(default)]
    pub properties: Vec<PropertyNode>,
}

/// A class property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    /// Property name.
    pub name: String,
    /// Primitive type name or class name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Element type when `type_name` is `array`.
    #[serde(default)]
    pub array_type: Option<String>,
    /// Referenced enumeration.
    #[serde(default)]
    pub enum_type: Option<String>,
    /// Default literal, parsed against the mapped type.
    #[serde(default)]
    pub default: Option<String>,
    /// Server-populated.
    #[serde(default)]
    pub read_only: bool,
    /// Settable on insert only.
    #[serde(default)]
    pub insert_only: bool,
    /// Never returned.
    #[serde(default)]
    pub write_only: bool,
    /// May be omitted.
    #[serde(default)]
    pub optional: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PropertyNode {
    /// Names of the flags that are set, in a fixed order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        [
            ("readOnly", self.read_only),
            ("insertOnly", self.insert_only),
            ("writeOnly", self.write_only),
            ("optional", self.optional),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Underlying representation of an enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumKind {
    /// Literal values are integers.
    Int,
    /// Literal values are strings.
    #[default]
    String,
}

/// An enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumNode {
    /// Enumeration name.
    pub name: String,
    /// Underlying kind.
    #[serde(default, rename = "enumType")]
    pub kind: EnumKind,
    /// Constants in declaration order.
    #[serde(default)]
    pub constants: Vec<EnumConstant>,
}

/// A `(constantName, literalValue)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnumConstant {
    /// Constant name (the option label).
    pub name: String,
    /// Raw literal.
    pub value: String,
}

/// A service: a named group of actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    /// Identifier used in the path (`/service/{id}/...`).
    pub id: String,
    /// Display name used for tags and operation ids.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Plugin the service belongs to.
    #[serde(default)]
    pub plugin: Option<String>,
    /// Actions in declaration order.
    #[serde(default)]
    pub actions: Vec<ActionNode>,
}

fn default_true() -> bool {
    true
}

/// An action of a service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    /// Action name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<ParamNode>,
    /// Declared result, `None` for void actions.
    #[serde(default)]
    pub result: Option<ResultNode>,
    /// Names of errors the action may raise.
    #[serde(default)]
    pub throws: Vec<String>,
    /// `false` when the action is callable without a session.
    #[serde(default = "default_true")]
    pub session_required: bool,
    /// Deprecated actions are flagged on the operation.
    #[serde(default)]
    pub deprecated: bool,
    /// Beta actions are flagged on the operation.
    #[serde(default)]
    pub beta: bool,
}

impl Default for ActionNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            params: Vec::new(),
            result: None,
            throws: Vec::new(),
            session_required: true,
            deprecated: false,
            beta: false,
        }
    }
}

impl ActionNode {
    /// Whether any declared parameter is a raw file upload.
    pub fn has_file_param(&self) -> bool {
        self.params.iter().any(|p| p.type_name == "file")
    }
}

/// An action parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamNode {
    /// Parameter name.
    pub name: String,
    /// Primitive type name or class name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Element type when `type_name` is `array`.
    #[serde(default)]
    pub array_type: Option<String>,
    /// Referenced enumeration.
    #[serde(default)]
    pub enum_type: Option<String>,
    /// Default literal.
    #[serde(default)]
    pub default: Option<String>,
    /// May be omitted.
    #[serde(default)]
    pub optional: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// An action result type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNode {
    /// Primitive type name or class name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Element type when `type_name` is `array`.
    #[serde(default)]
    pub array_type: Option<String>,
}

/// An entry of the global error catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNode {
    /// Error name (e.g. `ENTRY_ID_NOT_FOUND`).
    pub name: String,
    /// Numeric or symbolic code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Message template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ErrorNode {
    /// Message if present, otherwise the description.
    pub fn display_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.description.as_deref())
            .filter(|m| !m.is_empty())
    }
}

/// A request-wide parameter declared by the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfigParam {
    /// Parameter name.
    pub name: String,
    /// Primitive type name or class name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Value may change between otherwise identical requests.
    #[serde(default)]
    pub volatile: bool,
}
