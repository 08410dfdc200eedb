#![deny(missing_docs)]

//! # Enum Catalog
//!
//! Typed option lists for every enumeration, plus the canonical
//! (value-deduplicated) projection used everywhere an enum is exposed.

use crate::error::{AppError, AppResult};
use crate::model::{EnumKind, EnumNode};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// A single enum option.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumOption {
    /// Typed literal (integer for `int` enums, string otherwise).
    pub value: Value,
    /// Constant name.
    pub label: String,
}

/// All options of one enumeration, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    /// Underlying kind.
    pub kind: EnumKind,
    /// Options as declared, duplicates included.
    pub options: Vec<EnumOption>,
}

impl EnumEntry {
    /// Options with duplicate values removed; the first-declared label wins.
    pub fn canonical(&self) -> Vec<EnumOption> {
        let mut seen: Vec<&Value> = Vec::new();
        let mut out = Vec::new();
        for opt in &self.options {
            if seen.contains(&&opt.value) {
                continue;
            }
            seen.push(&opt.value);
            out.push(opt.clone());
        }
        out
    }
}

/// Values, labels and source enum name, ready to be attached to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValues {
    /// Name of the source enumeration, `None` for synthetic value sets.
    pub enum_type: Option<String>,
    /// Allowed values.
    pub values: Vec<Value>,
    /// Label per value (same length as `values`).
    pub labels: Vec<String>,
}

impl EnumValues {
    /// Builds from canonical options.
    pub fn from_options(enum_type: impl Into<String>, options: &[EnumOption]) -> Self {
        Self {
            enum_type: Some(enum_type.into()),
            values: options.iter().map(|o| o.value.clone()).collect(),
            labels: options.iter().map(|o| o.label.clone()).collect(),
        }
    }

    /// Adds values not yet present; existing labels are kept.
    pub fn union(&mut self, other: &EnumValues) {
        for (value, label) in other.values.iter().zip(&other.labels) {
            if !self.values.contains(value) {
                self.values.push(value.clone());
                self.labels.push(label.clone());
            }
        }
    }

    /// Writes `enum`, `x-enumLabels` and (when known) `x-enumType` into a schema object.
    ///
    /// An empty option list writes the labels and type but omits `enum`,
    /// since an empty `enum` admits no value at all.
    pub fn apply_to(&self, target: &mut Map<String, Value>) {
        if !self.values.is_empty() {
            target.insert("enum".to_string(), Value::Array(self.values.clone()));
        }
        target.insert("x-enumLabels".to_string(), json!(self.labels));
        if let Some(enum_type) = &self.enum_type {
            target.insert("x-enumType".to_string(), json!(enum_type));
        }
    }
}

/// Name-indexed registry of all enumerations.
#[derive(Debug, Clone, Default)]
pub struct EnumCatalog {
    entries: IndexMap<String, EnumEntry>,
}

impl EnumCatalog {
    /// Builds the catalog. Integer enums must carry integer literals.
    pub fn build(enums: &[EnumNode]) -> AppResult<Self> {
        let mut entries = IndexMap::new();
        for node in enums {
            let mut options = Vec::with_capacity(node.constants.len());
            for constant in &node.constants {
                let value = match node.kind {
                    EnumKind::Int => {
                        let parsed = constant.value.trim().parse::<i64>().map_err(|_| {
                            AppError::unknown_default(
                                constant.value.clone(),
                                "integer",
                                format!("{}.{}", node.name, constant.name),
                            )
                        })?;
                        Value::from(parsed)
                    }
                    EnumKind::String => Value::String(constant.value.clone()),
                };
                options.push(EnumOption {
                    value,
                    label: constant.name.clone(),
                });
            }
            entries.insert(
                node.name.clone(),
                EnumEntry {
                    kind: node.kind,
                    options,
                },
            );
        }
        Ok(Self { entries })
    }

    /// Looks up an enumeration.
    pub fn get(&self, name: &str) -> Option<&EnumEntry> {
        self.entries.get(name)
    }

    /// Whether the enumeration exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Canonical options of an enumeration, `None` if it is unknown.
    pub fn canonical_options(&self, name: &str) -> Option<Vec<EnumOption>> {
        self.entries.get(name).map(EnumEntry::canonical)
    }

    /// Canonical options packaged for a schema, `None` if the enum is unknown.
    pub fn values_for(&self, name: &str) -> Option<EnumValues> {
        self.canonical_options(name)
            .map(|opts| EnumValues::from_options(name, &opts))
    }

    /// Canonical options coerced to strings, for string-typed slots
    /// such as the synthetic `orderBy` property.
    pub fn string_values_for(&self, name: &str) -> Option<EnumValues> {
        let mut values = self.values_for(name)?;
        values.values = values
            .values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            })
            .collect();
        Some(values)
    }

    /// Number of enumerations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the catalog as the `x-enums` document section.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (name, entry) in &self.entries {
            let one_of = entry
                .canonical()
                .into_iter()
                .map(|opt| json!({ "title": opt.label, "enum": [opt.value] }))
                .collect::<Vec<_>>();
            out.insert(
                name.clone(),
                json!({ "title": name, "oneOf": one_of }),
            );
        }
        Value::Object(out)
    }
}
