#![deny(missing_docs)]

//! # Schema Index
//!
//! Name lookup and hierarchy queries over the class forest.
//!
//! Transitive descendants are computed once, at construction, by fixed-point
//! expansion over the direct-subclass adjacency map and cached for all queries.

use crate::error::{AppError, AppResult};
use crate::model::ClassNode;
use crate::type_mapper::is_primitive_name;
use indexmap::{IndexMap, IndexSet};

/// Hierarchy index over a borrowed class list.
#[derive(Debug)]
pub struct SchemaIndex<'a> {
    root: String,
    classes: IndexMap<&'a str, &'a ClassNode>,
    children: IndexMap<&'a str, Vec<&'a str>>,
    descendants: IndexMap<&'a str, Vec<&'a str>>,
}

impl<'a> SchemaIndex<'a> {
    /// Builds the index.
    ///
    /// `root` names the synthetic terminal ancestor; a base naming it is valid
    /// and is treated as "no base". Fails on duplicate class names and on base
    /// names that resolve to nothing.
    pub fn build(classes: &'a [ClassNode], root: &str) -> AppResult<Self> {
        let mut by_name: IndexMap<&'a str, &'a ClassNode> = IndexMap::new();
        for class in classes {
            if class.name == root {
                return Err(AppError::malformed(format!(
                    "Class '{}' collides with the root definition",
                    class.name
                )));
            }
            if by_name.insert(class.name.as_str(), class).is_some() {
                return Err(AppError::malformed(format!(
                    "Class '{}' is declared more than once",
                    class.name
                )));
            }
        }

        let mut children: IndexMap<&'a str, Vec<&'a str>> =
            by_name.keys().map(|name| (*name, Vec::new())).collect();
        for class in classes {
            let Some(base) = class.base.as_deref() else {
                continue;
            };
            if base == root {
                continue;
            }
            match children.get_mut(base) {
                Some(subs) => subs.push(class.name.as_str()),
                None => {
                    return Err(AppError::malformed(format!(
                        "Base class '{}' of '{}' not found",
                        base, class.name
                    )))
                }
            }
        }

        let descendants = expand_descendants(&children);

        Ok(Self {
            root: root.to_string(),
            classes: by_name,
            children,
            descendants,
        })
    }

    /// Name of the synthetic root definition.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Looks up a class, failing if it does not exist.
    pub fn class_by_name(&self, name: &str) -> AppResult<&'a ClassNode> {
        self.get(name)
            .ok_or_else(|| AppError::malformed(format!("Class '{}' not found", name)))
    }

    /// Looks up a class.
    pub fn get(&self, name: &str) -> Option<&'a ClassNode> {
        self.classes.get(name).copied()
    }

    /// Whether `name` is a class or the synthetic root.
    pub fn is_known_class(&self, name: &str) -> bool {
        name == self.root || self.classes.contains_key(name)
    }

    /// Checks that a type name is a primitive or resolves to a class.
    pub fn check_type(&self, type_name: &str, context: &str) -> AppResult<()> {
        if is_primitive_name(type_name) || self.is_known_class(type_name) {
            Ok(())
        } else {
            Err(AppError::malformed(format!(
                "Unresolvable type '{}' in {}",
                type_name, context
            )))
        }
    }

    /// Whether a type name denotes a class reference (including the root).
    pub fn is_reference(&self, type_name: &str) -> bool {
        !is_primitive_name(type_name) && self.is_known_class(type_name)
    }

    /// All classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &'a ClassNode> + '_ {
        self.classes.values().copied()
    }

    /// Direct subclasses in declaration order.
    pub fn direct_subclasses(&self, name: &str) -> &[&'a str] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive subclasses, generation by generation.
    pub fn all_descendants(&self, name: &str) -> &[&'a str] {
        self.descendants.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive subclasses that are not abstract.
    pub fn concrete_descendants(&self, name: &str) -> Vec<&'a str> {
        self.all_descendants(name)
            .iter()
            .copied()
            .filter(|n| self.get(n).map(|c| !c.is_abstract).unwrap_or(false))
            .collect()
    }

    /// Ancestors from the topmost base down to the direct base.
    ///
    /// Excludes the class itself and the synthetic root.
    pub fn ancestor_chain(&self, name: &str) -> Vec<&'a str> {
        let mut chain: Vec<&'a str> = Vec::new();
        let mut current = self.get(name);
        while let Some(class) = current {
            let Some(base) = class.base.as_deref() else {
                break;
            };
            let Some(base_class) = self.get(base) else {
                break;
            };
            if chain.contains(&base_class.name.as_str()) {
                break;
            }
            chain.push(base_class.name.as_str());
            current = Some(base_class);
        }
        chain.reverse();
        chain
    }
}

/// Descendants of every class: the direct subclasses first, then the
/// subtree of each subclass in turn.
fn expand_descendants<'a>(
    children: &IndexMap<&'a str, Vec<&'a str>>,
) -> IndexMap<&'a str, Vec<&'a str>> {
    let mut out = IndexMap::with_capacity(children.len());
    for name in children.keys() {
        let mut found: IndexSet<&'a str> = IndexSet::new();
        collect_descendants(children, name, name, &mut found);
        out.insert(*name, found.into_iter().collect());
    }
    out
}

fn collect_descendants<'a>(
    children: &IndexMap<&'a str, Vec<&'a str>>,
    root: &str,
    name: &str,
    found: &mut IndexSet<&'a str>,
) {
    let Some(direct) = children.get(name) else {
        return;
    };
    // Already-seen names are skipped so an inheritance cycle terminates.
    let fresh = direct
        .iter()
        .copied()
        .filter(|child| *child != root && found.insert(*child))
        .collect::<Vec<_>>();
    for child in fresh {
        collect_descendants(children, root, child, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, base: Option<&str>, is_abstract: bool) -> ClassNode {
        ClassNode {
            name: name.into(),
            base: base.map(Into::into),
            is_abstract,
            ..Default::default()
        }
    }

    fn sample() -> Vec<ClassNode> {
        vec![
            class("Base", Some("ObjectBase"), true),
            class("Foo", Some("Base"), false),
            class("Mid", Some("Base"), true),
            class("Bar", Some("Mid"), false),
            class("Baz", Some("Bar"), false),
            class("Lonely", None, false),
        ]
    }

    #[test]
    fn test_descendants_children_then_subtrees() {
        let classes = sample();
        let index = SchemaIndex::build(&classes, "ObjectBase").unwrap();
        assert_eq!(index.direct_subclasses("Base"), &["Foo", "Mid"]);
        assert_eq!(index.all_descendants("Base"), &["Foo", "Mid", "Bar", "Baz"]);
        assert_eq!(index.concrete_descendants("Base"), vec!["Foo", "Bar", "Baz"]);
        assert!(index.all_descendants("Lonely").is_empty());
    }

    #[test]
    fn test_descendants_follow_each_subtree() {
        let classes = vec![
            class("Root", None, true),
            class("A", Some("Root"), false),
            class("B", Some("Root"), false),
            class("A1", Some("A"), false),
            class("B1", Some("B"), false),
            class("A2", Some("A1"), false),
        ];
        let index = SchemaIndex::build(&classes, "ObjectBase").unwrap();
        assert_eq!(index.all_descendants("Root"), &["A", "B", "A1", "A2", "B1"]);
        assert_eq!(index.all_descendants("A"), &["A1", "A2"]);
    }

    #[test]
    fn test_ancestor_chain_base_first() {
        let classes = sample();
        let index = SchemaIndex::build(&classes, "ObjectBase").unwrap();
        assert_eq!(index.ancestor_chain("Baz"), vec!["Base", "Mid", "Bar"]);
        assert!(index.ancestor_chain("Base").is_empty());
    }

    #[test]
    fn test_missing_base_is_malformed() {
        let classes = vec![class("Orphan", Some("Ghost"), false)];
        let err = SchemaIndex::build(&classes, "ObjectBase").unwrap_err();
        assert!(matches!(err, AppError::MalformedSchema(msg) if msg.contains("Ghost")));
    }

    #[test]
    fn test_duplicate_class_is_malformed() {
        let classes = vec![class("Twice", None, false), class("Twice", None, false)];
        assert!(SchemaIndex::build(&classes, "ObjectBase").is_err());
    }

    #[test]
    fn test_class_named_like_root_is_malformed() {
        let classes = vec![class("ObjectBase", None, false)];
        let err = SchemaIndex::build(&classes, "ObjectBase").unwrap_err();
        assert!(matches!(err, AppError::MalformedSchema(msg) if msg.contains("root")));
    }

    #[test]
    fn test_lookup_and_type_checks() {
        let classes = sample();
        let index = SchemaIndex::build(&classes, "ObjectBase").unwrap();
        assert!(index.class_by_name("Nope").is_err());
        assert!(index.is_reference("Foo"));
        assert!(index.is_reference("ObjectBase"));
        assert!(!index.is_reference("int"));
        assert!(index.check_type("string", "test").is_ok());
        assert!(index.check_type("Unknown", "test").is_err());
    }
}
