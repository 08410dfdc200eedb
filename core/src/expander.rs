#![deny(missing_docs)]

//! # Parameter Expander
//!
//! Flattens a class into query parameters named by bracket paths, e.g.
//! `[filter][createdAtGreaterThanOrEqual]`.
//!
//! Traversal is depth-first. At every path prefix the inherited properties are
//! visited before the class's own properties; reference properties recurse with
//! the prefix extended by `[name]`. Recursion stops once the prefix reaches the
//! configured bracket depth, and the cut-off prefixes are reported.
//!
//! At a polymorphic point a synthetic `[objectType]` parameter is emitted and
//! every concrete descendant is walked; the parameters reached through a
//! descendant carry a show-condition on that `objectType` value. A name reached
//! more than once is merged into the existing descriptor by [`merge_flat_param`].

use crate::definitions::{
    definition_ref, order_by_enum_name, DefinitionSet, PropertyKind, DISCRIMINATOR, ORDER_BY,
};
use crate::enum_catalog::{EnumCatalog, EnumValues};
use crate::error::{AppError, AppResult};
use crate::schema_index::SchemaIndex;
use crate::type_mapper::PrimitiveType;
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

static LAST_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)\[[^\]]+\]$").unwrap());

/// Number of bracket segments in a flattened name.
pub fn bracket_depth(name: &str) -> usize {
    name.matches('[').count()
}

/// The name with its last bracket segment removed (`a[b][c]` → `a[b]`).
pub fn parent_path(name: &str) -> Option<&str> {
    LAST_SEGMENT
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// "Only show this parameter when `name` is one of `values`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowCondition {
    /// Controlling parameter name.
    pub name: String,
    /// Trigger values.
    pub values: Vec<String>,
}

/// A flattened query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatParam {
    /// Bracket-path name.
    pub name: String,
    /// Primitive type.
    pub ty: PrimitiveType,
    /// `items` schema of array parameters.
    pub items: Option<Value>,
    /// Allowed values.
    pub enum_values: Option<EnumValues>,
    /// Description carried over from the property.
    pub description: Option<String>,
    /// UI group (the parent path), set by [`FlatParam::qualified`].
    pub group: Option<String>,
    /// Visibility condition.
    pub show_condition: Option<ShowCondition>,
}

impl FlatParam {
    fn leaf(name: String, ty: PrimitiveType) -> Self {
        Self {
            name,
            ty,
            items: None,
            enum_values: None,
            description: None,
            group: None,
            show_condition: None,
        }
    }

    /// Prefixes the name (and the controlling name) with `root` and derives the group.
    pub fn qualified(&self, root: &str) -> FlatParam {
        let name = format!("{}{}", root, self.name);
        let group = parent_path(&name).map(str::to_string);
        FlatParam {
            name,
            group,
            show_condition: self.show_condition.as_ref().map(|c| ShowCondition {
                name: format!("{}{}", root, c.name),
                values: c.values.clone(),
            }),
            ..self.clone()
        }
    }

    /// Renders the parameter object.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("name".into(), json!(self.name));
        out.insert("in".into(), json!("query"));
        out.insert("type".into(), json!(self.ty.as_str()));
        if let Some(items) = &self.items {
            out.insert("items".into(), items.clone());
        }
        if let Some(values) = &self.enum_values {
            values.apply_to(&mut out);
        }
        if let Some(desc) = &self.description {
            out.insert("description".into(), json!(desc));
        }
        if let Some(group) = &self.group {
            out.insert("x-group".into(), json!(group));
        }
        if let Some(cond) = &self.show_condition {
            out.insert(
                "x-showCondition".into(),
                json!({ "name": cond.name, "value": cond.values }),
            );
        }
        Value::Object(out)
    }
}

/// Merges a second sighting of a flattened name into the existing descriptor.
///
/// - Show-conditions on the same controlling parameter union their trigger
///   values. Any unconditional sighting, or conditions on different controlling
///   parameters, leave the descriptor unconditional.
/// - Enum value sets union, the first-seen label winning. An enum-less
///   descriptor stays enum-less.
pub fn merge_flat_param(existing: &mut FlatParam, incoming: &FlatParam) {
    existing.show_condition = match (existing.show_condition.take(), &incoming.show_condition) {
        (Some(mut current), Some(other)) if current.name == other.name => {
            for value in &other.values {
                if !current.values.contains(value) {
                    current.values.push(value.clone());
                }
            }
            Some(current)
        }
        _ => None,
    };
    if let (Some(current), Some(other)) = (&mut existing.enum_values, &incoming.enum_values) {
        current.union(other);
    }
}

/// Result of expanding one class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expansion {
    /// Flattened parameters, names relative to the expanded parameter.
    pub params: Vec<FlatParam>,
    /// Prefixes at which recursion was cut off by the depth bound.
    pub truncated: Vec<String>,
}

struct Walk {
    root_order_by: Option<EnumValues>,
    params: IndexMap<String, FlatParam>,
    truncated: IndexSet<String>,
}

impl Walk {
    fn add(&mut self, param: FlatParam) {
        match self.params.get_mut(&param.name) {
            Some(existing) => merge_flat_param(existing, &param),
            None => {
                self.params.insert(param.name.clone(), param);
            }
        }
    }
}

/// Flattens classes into query parameters.
pub struct ParameterExpander<'a> {
    index: &'a SchemaIndex<'a>,
    definitions: &'a DefinitionSet,
    enums: &'a EnumCatalog,
    max_depth: usize,
}

impl<'a> ParameterExpander<'a> {
    /// Creates an expander bounded at `max_depth` bracket segments.
    pub fn new(
        index: &'a SchemaIndex<'a>,
        definitions: &'a DefinitionSet,
        enums: &'a EnumCatalog,
        max_depth: usize,
    ) -> Self {
        Self {
            index,
            definitions,
            enums,
            max_depth,
        }
    }

    /// Flattens `class_name`.
    pub fn expand(&self, class_name: &str) -> AppResult<Expansion> {
        let mut walk = Walk {
            root_order_by: order_by_enum_name(class_name)
                .and_then(|name| self.enums.string_values_for(&name)),
            params: IndexMap::new(),
            truncated: IndexSet::new(),
        };
        self.visit(&mut walk, class_name, "", None, true, true)?;
        Ok(Expansion {
            params: walk.params.into_values().collect(),
            truncated: walk.truncated.into_iter().collect(),
        })
    }

    fn visit(
        &self,
        walk: &mut Walk,
        class_name: &str,
        prefix: &str,
        cond: Option<&ShowCondition>,
        with_ancestors: bool,
        with_variants: bool,
    ) -> AppResult<()> {
        if bracket_depth(prefix) >= self.max_depth {
            walk.truncated.insert(prefix.to_string());
            return Ok(());
        }
        if class_name == self.definitions.root() {
            return Ok(());
        }
        let def = self.definitions.get(class_name).ok_or_else(|| {
            AppError::malformed(format!("Definition '{}' not found", class_name))
        })?;

        if with_ancestors {
            for ancestor in self.index.ancestor_chain(class_name) {
                self.visit(walk, ancestor, prefix, cond, false, false)?;
            }
        }

        for prop in &def.properties {
            if prop.discriminator || prop.read_only {
                continue;
            }
            let name = format!("{}[{}]", prefix, prop.name);
            let mut leaf = match &prop.kind {
                PropertyKind::Reference(target) => {
                    self.visit(walk, target, &name, cond, true, true)?;
                    continue;
                }
                PropertyKind::ReferenceArray(target) => {
                    let mut any_of = vec![definition_ref(target)];
                    any_of.extend(
                        self.index
                            .all_descendants(target)
                            .iter()
                            .map(|d| definition_ref(d)),
                    );
                    let mut leaf = FlatParam::leaf(name, PrimitiveType::Array);
                    leaf.items = Some(json!({ "type": "object", "anyOf": any_of }));
                    leaf
                }
                PropertyKind::Primitive {
                    ty,
                    items,
                    enum_values,
                    ..
                } => {
                    let mut leaf = FlatParam::leaf(name, *ty);
                    leaf.items = items.map(|t| json!({ "type": t.as_str() }));
                    leaf.enum_values = enum_values.clone();
                    if leaf.enum_values.is_none() && prop.name == ORDER_BY {
                        leaf.enum_values = walk.root_order_by.clone();
                    }
                    leaf
                }
            };
            leaf.description = prop.description.clone();
            leaf.show_condition = cond.cloned();
            walk.add(leaf);
        }

        if with_variants && def.is_polymorphic() {
            let disc_name = format!("{}[{}]", prefix, DISCRIMINATOR);
            let mut disc = FlatParam::leaf(disc_name.clone(), PrimitiveType::String);
            disc.enum_values = Some(EnumValues {
                enum_type: None,
                values: def.variants.iter().map(|v| json!(v)).collect(),
                labels: def.variants.clone(),
            });
            disc.show_condition = cond.cloned();
            walk.add(disc);

            for variant in self.index.concrete_descendants(class_name) {
                let branch = ShowCondition {
                    name: disc_name.clone(),
                    values: vec![variant.to_string()],
                };
                self.visit(walk, variant, prefix, Some(&branch), true, false)?;
            }
        }
        Ok(())
    }
}
