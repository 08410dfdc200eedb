#![deny(missing_docs)]

//! # Definition Builder
//!
//! Turns every class into a structural definition.
//!
//! The result is a typed, name-indexed registry ([`DefinitionSet`]) rather than
//! raw JSON: the parameter expander walks it, and [`DefinitionSet::to_value`]
//! renders it into the document's `definitions` section.
//!
//! Inheritance is encoded as `allOf: [base]`. Runtime polymorphism is encoded as
//! a discriminated union: a class with concrete descendants gets an `objectType`
//! string property listing the valid variants, a matching `anyOf` of references,
//! and `discriminator: objectType`.

use crate::enum_catalog::{EnumCatalog, EnumValues};
use crate::error::{AppResult, Diagnostic};
use crate::model::{ClassNode, PropertyNode};
use crate::schema_index::SchemaIndex;
use crate::text::{fix_markdown, flag_badges, join_paragraphs};
use crate::type_mapper::{PrimitiveType, TypeMapper};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Name of the synthetic discriminator property.
pub const DISCRIMINATOR: &str = "objectType";

/// Name of the synthetic sort-order property of filter classes.
pub const ORDER_BY: &str = "orderBy";

/// Name of the request envelope definition used by the enveloped profile.
pub const ENVELOPE_DEFINITION: &str = "RequestEnvelope";

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Builds a `{"$ref": "#/definitions/<name>"}` object.
pub fn definition_ref(name: &str) -> Value {
    json!({ "$ref": format!("{}{}", DEFINITIONS_PREFIX, name) })
}

/// Extracts the definition name from a `#/definitions/<name>` reference.
pub fn definition_name(reference: &str) -> Option<&str> {
    reference.strip_prefix(DEFINITIONS_PREFIX)
}

/// The `*OrderBy` enum name paired with a `*Filter` class name.
pub fn order_by_enum_name(class_name: &str) -> Option<String> {
    class_name
        .strip_suffix("Filter")
        .map(|stem| format!("{}OrderBy", stem))
}

/// Shape of a definition property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// Cross-reference to another definition.
    Reference(String),
    /// Array of cross-references.
    ReferenceArray(String),
    /// A primitive value.
    Primitive {
        /// Mapped type (may be `File` until the finishing pass).
        ty: PrimitiveType,
        /// Element type of primitive arrays.
        items: Option<PrimitiveType>,
        /// Parsed default.
        default: Option<Value>,
        /// Canonical enum options.
        enum_values: Option<EnumValues>,
    },
}

/// A property of a [`ClassDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionProperty {
    /// Property name.
    pub name: String,
    /// Shape.
    pub kind: PropertyKind,
    /// Server-populated; excluded from input surfaces.
    pub read_only: bool,
    /// Rendered description.
    pub description: Option<String>,
    /// `true` for the synthetic `objectType` property.
    pub discriminator: bool,
}

impl DefinitionProperty {
    /// Renders the property schema.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            PropertyKind::Reference(target) => return definition_ref(target),
            PropertyKind::ReferenceArray(target) => {
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), definition_ref(target));
                return Value::Object(out);
            }
            PropertyKind::Primitive {
                ty,
                items,
                default,
                enum_values,
            } => {
                out.insert("type".into(), json!(ty.as_str()));
                if let Some(item_ty) = items {
                    out.insert("items".into(), json!({ "type": item_ty.as_str() }));
                }
                if self.read_only {
                    out.insert("readOnly".into(), json!(true));
                }
                if let Some(default) = default {
                    out.insert("default".into(), default.clone());
                }
                match enum_values {
                    Some(values) if self.discriminator => {
                        out.insert("enum".into(), Value::Array(values.values.clone()));
                    }
                    Some(values) => values.apply_to(&mut out),
                    None => {}
                }
            }
        }
        if let Some(desc) = &self.description {
            out.insert("description".into(), json!(desc));
        }
        Value::Object(out)
    }
}

/// The structural definition of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    /// Class name.
    pub name: String,
    /// Base class (possibly the synthetic root), `None` for base-less classes.
    pub base: Option<String>,
    /// Abstract flag.
    pub is_abstract: bool,
    /// Rendered description.
    pub description: Option<String>,
    /// Synthetic properties first, then declared ones.
    pub properties: Vec<DefinitionProperty>,
    /// Valid `objectType` values; empty when the class is not polymorphic.
    pub variants: Vec<String>,
}

impl ClassDefinition {
    /// Whether the class is a polymorphic point.
    pub fn is_polymorphic(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&DefinitionProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Renders the definition schema.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("title".into(), json!(self.name));
        out.insert("type".into(), json!("object"));

        let props = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.to_value()))
            .collect::<Map<_, _>>();
        out.insert("properties".into(), Value::Object(props));

        if let Some(base) = &self.base {
            out.insert("allOf".into(), json!([definition_ref(base)]));
        }
        if self.is_polymorphic() {
            out.insert("x-abstract".into(), json!(self.is_abstract));
            let union = self
                .variants
                .iter()
                .map(|v| definition_ref(v))
                .collect::<Vec<_>>();
            out.insert("anyOf".into(), Value::Array(union));
            out.insert("discriminator".into(), json!(DISCRIMINATOR));
        }
        if let Some(desc) = &self.description {
            out.insert("description".into(), json!(desc));
        }
        Value::Object(out)
    }
}

/// Name-indexed registry of all class definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    root: String,
    definitions: IndexMap<String, ClassDefinition>,
}

impl DefinitionSet {
    /// Looks up a definition.
    pub fn get(&self, name: &str) -> Option<&ClassDefinition> {
        self.definitions.get(name)
    }

    /// Name of the synthetic root definition.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Definitions in class declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.definitions.values()
    }

    /// Number of class definitions (root excluded).
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether there are no class definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Renders the `definitions` section: the root first, then every class.
    pub fn to_value(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(self.root.clone(), json!({}));
        for (name, def) in &self.definitions {
            out.insert(name.clone(), def.to_value());
        }
        out
    }
}

/// The request envelope definition of the enveloped profile.
pub fn envelope_definition(session_parameter: &str, api_version: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            session_parameter: { "type": "string" },
            "apiVersion": { "type": "string", "default": api_version },
        }
    })
}

/// Builds [`ClassDefinition`]s from the indexed classes.
pub struct DefinitionBuilder<'a, M: TypeMapper> {
    index: &'a SchemaIndex<'a>,
    enums: &'a EnumCatalog,
    mapper: &'a M,
}

impl<'a, M: TypeMapper> DefinitionBuilder<'a, M> {
    /// Creates a builder.
    pub fn new(index: &'a SchemaIndex<'a>, enums: &'a EnumCatalog, mapper: &'a M) -> Self {
        Self {
            index,
            enums,
            mapper,
        }
    }

    /// Builds every class definition. Fails on the first malformed class.
    pub fn build(&self, diagnostics: &mut Vec<Diagnostic>) -> AppResult<DefinitionSet> {
        let mut definitions = IndexMap::new();
        for class in self.index.classes() {
            let def = self.build_class(class, diagnostics)?;
            definitions.insert(class.name.clone(), def);
        }
        Ok(DefinitionSet {
            root: self.index.root().to_string(),
            definitions,
        })
    }

    /// Builds the definition of a single class.
    pub fn build_class(
        &self,
        class: &ClassNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<ClassDefinition> {
        let mut properties = Vec::new();

        let mut variants: Vec<String> = Vec::new();
        let concrete = self.index.concrete_descendants(&class.name);
        if !concrete.is_empty() {
            if !class.is_abstract {
                variants.push(class.name.clone());
            }
            variants.extend(concrete.iter().map(|s| s.to_string()));
            properties.push(DefinitionProperty {
                name: DISCRIMINATOR.into(),
                kind: PropertyKind::Primitive {
                    ty: PrimitiveType::String,
                    items: None,
                    default: None,
                    enum_values: None,
                },
                read_only: false,
                description: None,
                discriminator: true,
            });
        } else if !self.index.all_descendants(&class.name).is_empty() {
            Diagnostic::LookupMiss {
                what: "concrete subclass",
                name: class.name.clone(),
                context: format!("{} discriminator", DISCRIMINATOR),
            }
            .emit(diagnostics);
        }

        let order_by = order_by_enum_name(&class.name)
            .and_then(|enum_name| self.enums.string_values_for(&enum_name));

        for prop in &class.properties {
            let mut def_prop = self.build_property(class, prop, diagnostics)?;
            if prop.name == ORDER_BY {
                if let (Some(values), PropertyKind::Primitive { enum_values, .. }) =
                    (&order_by, &mut def_prop.kind)
                {
                    if enum_values.is_none() {
                        *enum_values = Some(values.clone());
                    }
                }
            }
            properties.push(def_prop);
        }

        if let Some(values) = order_by {
            if !class.properties.iter().any(|p| p.name == ORDER_BY) {
                let at = properties.iter().take_while(|p| p.discriminator).count();
                properties.insert(
                    at,
                    DefinitionProperty {
                        name: ORDER_BY.into(),
                        kind: PropertyKind::Primitive {
                            ty: PrimitiveType::String,
                            items: None,
                            default: None,
                            enum_values: Some(values),
                        },
                        read_only: false,
                        description: None,
                        discriminator: false,
                    },
                );
            }
        }

        // The discriminator enum is the variant list itself.
        if let Some(disc) = properties.iter_mut().find(|p| p.discriminator) {
            if let PropertyKind::Primitive { enum_values, .. } = &mut disc.kind {
                *enum_values = Some(EnumValues {
                    enum_type: None,
                    values: variants.iter().map(|v| json!(v)).collect(),
                    labels: variants.clone(),
                });
            }
        }

        let base = match class.base.as_deref() {
            Some(b) => {
                self.index.check_type(b, &class.name)?;
                Some(b.to_string())
            }
            None => None,
        };
        let flags: &[&str] = if class.is_abstract { &["abstract"] } else { &[] };

        Ok(ClassDefinition {
            name: class.name.clone(),
            base,
            is_abstract: class.is_abstract,
            description: join_paragraphs(vec![
                flag_badges(flags),
                fix_markdown(class.description.as_deref()),
            ]),
            properties,
            variants,
        })
    }

    fn build_property(
        &self,
        class: &ClassNode,
        prop: &PropertyNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AppResult<DefinitionProperty> {
        let context = format!("{}.{}", class.name, prop.name);
        self.index.check_type(&prop.type_name, &context)?;

        let make = |kind| DefinitionProperty {
            name: prop.name.clone(),
            kind,
            read_only: prop.read_only,
            description: None,
            discriminator: false,
        };

        if self.index.is_reference(&prop.type_name) {
            return Ok(make(PropertyKind::Reference(prop.type_name.clone())));
        }

        let ty = self.mapper.map(&prop.type_name)?;
        let mut items = None;
        if ty == PrimitiveType::Array {
            if let Some(element) = prop.array_type.as_deref() {
                self.index.check_type(element, &context)?;
                if self.index.is_reference(element) {
                    return Ok(make(PropertyKind::ReferenceArray(element.to_string())));
                }
                items = Some(self.mapper.map(element)?);
            }
        }

        let default = self
            .mapper
            .parse_default(prop.default.as_deref(), ty, &context)?;

        let mut enum_note = None;
        let enum_values = match prop.enum_type.as_deref() {
            None => None,
            Some(enum_name) => {
                enum_note = Some(format!("Enum Type: `{}`", enum_name));
                let found = self.enums.values_for(enum_name);
                if found.is_none() {
                    Diagnostic::LookupMiss {
                        what: "enum",
                        name: enum_name.to_string(),
                        context: context.clone(),
                    }
                    .emit(diagnostics);
                }
                found
            }
        };

        let mut out = make(PropertyKind::Primitive {
            ty,
            items,
            default,
            enum_values,
        });
        out.description = join_paragraphs(vec![
            flag_badges(&prop.flag_names()),
            enum_note,
            fix_markdown(prop.description.as_deref()),
        ]);
        Ok(out)
    }
}
