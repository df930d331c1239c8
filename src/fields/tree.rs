//! Arena-backed schema tree and its builder
//!
//! Nodes live in a slot vector addressed by `NodeId`. Containers hold
//! ordered child handles. A sequence declared with a single element keeps a
//! detached, pristine copy of it as the template for repeated items.
//!
//! Invariants:
//! - Every live leaf has a non-empty alias, unique within the tree
//! - The alias index maps exactly the live leaves (templates are detached)
//! - A leaf's default always matches its declared type

use std::collections::HashMap;

use super::declaration::{Declaration, FieldSpec};
use super::types::{FieldType, Leaf, Value};
use crate::observability::{log_event_with_fields, Event};

/// Handle of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf(Leaf),
    Container(Container),
}

#[derive(Debug, Clone)]
pub(crate) enum Container {
    Map(Vec<(String, NodeId)>),
    Seq {
        items: Vec<NodeId>,
        template: Option<Template>,
    },
}

/// Pristine per-item shape of a template sequence.
#[derive(Debug, Clone)]
pub(crate) struct Template {
    /// Detached subtree, aliases at index `0`
    pub(crate) root: NodeId,
    /// Alias of the owning sequence
    pub(crate) base: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
    aliases: HashMap<String, NodeId>,
}

impl SchemaTree {
    /// Normalizes a declaration into a tree, depth-first.
    ///
    /// A root that is not a container yields an empty tree.
    pub(crate) fn build(declaration: Declaration) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            aliases: HashMap::new(),
        };

        let declaration = match declaration {
            Declaration::Tree(fields) => fields.to_declaration(),
            other => other,
        };
        let root = match declaration {
            Declaration::Map(_) | Declaration::Seq(_) => tree.build_node(declaration, ""),
            _ => None,
        };
        tree.root = match root {
            Some(id) => id,
            None => tree.alloc(Node::Container(Container::Map(Vec::new()))),
        };

        let leaves = tree.aliases.len().to_string();
        log_event_with_fields(Event::TreeBuilt, &[("leaves", leaves.as_str())]);
        tree
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn leaf(&self, alias: &str) -> Option<&Leaf> {
        match self.aliases.get(alias).map(|id| self.node(*id)) {
            Some(Node::Leaf(leaf)) => Some(leaf),
            _ => None,
        }
    }

    pub(crate) fn leaf_mut(&mut self, alias: &str) -> Option<&mut Leaf> {
        let id = *self.aliases.get(alias)?;
        match self.node_mut(id) {
            Node::Leaf(leaf) => Some(leaf),
            Node::Container(_) => None,
        }
    }

    pub(crate) fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub(crate) fn leaf_count(&self) -> usize {
        self.aliases.len()
    }

    /// Live children of a container in walk order; templates excluded.
    pub(crate) fn children(&self, id: NodeId) -> Vec<(String, NodeId)> {
        match self.node(id) {
            Node::Leaf(_) => Vec::new(),
            Node::Container(Container::Map(entries)) => entries.clone(),
            Node::Container(Container::Seq { items, .. }) => items
                .iter()
                .enumerate()
                .map(|(i, id)| (i.to_string(), *id))
                .collect(),
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn build_node(&mut self, declaration: Declaration, alias: &str) -> Option<NodeId> {
        let leaf = match declaration {
            Declaration::Undefined | Declaration::Literal(Value::Null) => return None,
            Declaration::Type(field_type) => normalize_leaf(FieldSpec::new(field_type), alias),
            // Untagged sequences and mappings are containers, even as literals.
            Declaration::Literal(Value::Array(values)) => {
                let items = values.into_iter().map(Declaration::Literal).collect();
                return Some(self.build_seq(items, alias));
            }
            Declaration::Literal(Value::Object(map)) => {
                let entries = map
                    .into_iter()
                    .map(|(key, value)| (key, Declaration::Literal(value)))
                    .collect();
                return Some(self.build_map(entries, alias));
            }
            Declaration::Literal(value) => literal_leaf(value, alias),
            Declaration::Descriptor(spec) => normalize_leaf(spec, alias),
            Declaration::Map(entries) => return Some(self.build_map(entries, alias)),
            Declaration::Seq(items) => return Some(self.build_seq(items, alias)),
            Declaration::Tree(fields) => return self.build_node(fields.to_declaration(), alias),
        };
        let id = self.alloc(Node::Leaf(leaf));
        self.aliases.insert(alias.to_string(), id);
        Some(id)
    }

    fn build_map(&mut self, entries: Vec<(String, Declaration)>, alias: &str) -> NodeId {
        let mut children: Vec<(String, NodeId)> = Vec::with_capacity(entries.len());
        for (key, declaration) in entries {
            let child_alias = join_alias(alias, &key);
            if child_alias.is_empty() {
                continue;
            }
            let Some(child) = self.build_node(declaration, &child_alias) else {
                continue;
            };
            // A repeated key replaces the earlier entry.
            match children.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => {
                    let old = std::mem::replace(&mut slot.1, child);
                    self.release(old);
                }
                None => children.push((key, child)),
            }
        }
        self.alloc(Node::Container(Container::Map(children)))
    }

    fn build_seq(&mut self, declarations: Vec<Declaration>, alias: &str) -> NodeId {
        let declared = declarations.len();
        let mut items = Vec::with_capacity(declared);
        // Skipped entries leave no gap: aliases follow item positions.
        for declaration in declarations {
            let child_alias = join_alias(alias, &items.len().to_string());
            if let Some(child) = self.build_node(declaration, &child_alias) {
                items.push(child);
            }
        }

        let template = match items.as_slice() {
            [only] if declared == 1 => Some(Template {
                root: self.clone_subtree(*only),
                base: alias.to_string(),
            }),
            _ => None,
        };
        self.alloc(Node::Container(Container::Seq { items, template }))
    }

    /// Deep-copies a subtree into fresh slots. The copy is not registered.
    pub(crate) fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let node = match self.node(id).clone() {
            Node::Leaf(leaf) => Node::Leaf(leaf),
            Node::Container(Container::Map(entries)) => Node::Container(Container::Map(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, self.clone_subtree(child)))
                    .collect(),
            )),
            Node::Container(Container::Seq { items, template }) => {
                let items = items.into_iter().map(|child| self.clone_subtree(child)).collect();
                let template = template.map(|t| Template {
                    root: self.clone_subtree(t.root),
                    base: t.base,
                });
                Node::Container(Container::Seq { items, template })
            }
        };
        self.alloc(node)
    }

    /// Rewrites every alias under `id`, templates included, from the `from`
    /// path prefix to `to`.
    pub(crate) fn rewrite_aliases(&mut self, id: NodeId, from: &str, to: &str) {
        let nested: Vec<NodeId> = match self.node_mut(id) {
            Node::Leaf(leaf) => {
                if let Some(alias) = rewrite_alias(&leaf.alias, from, to) {
                    leaf.alias = alias;
                }
                Vec::new()
            }
            Node::Container(Container::Map(entries)) => entries.iter().map(|(_, c)| *c).collect(),
            Node::Container(Container::Seq { items, template }) => {
                if let Some(t) = template {
                    if let Some(base) = rewrite_alias(&t.base, from, to) {
                        t.base = base;
                    }
                }
                let mut nested = items.clone();
                nested.extend(template.as_ref().map(|t| t.root));
                nested
            }
        };
        for child in nested {
            self.rewrite_aliases(child, from, to);
        }
    }

    /// Adds every live leaf under `id` to the alias index.
    pub(crate) fn register(&mut self, id: NodeId) {
        match self.node(id) {
            Node::Leaf(leaf) => {
                let alias = leaf.alias.clone();
                self.aliases.insert(alias, id);
            }
            Node::Container(_) => {
                for (_, child) in self.children(id) {
                    self.register(child);
                }
            }
        }
    }

    /// Drops a subtree: unregisters its leaves and frees its slots.
    pub(crate) fn release(&mut self, id: NodeId) {
        let nested: Vec<NodeId> = match self.node(id) {
            Node::Leaf(leaf) => {
                if self.aliases.get(&leaf.alias) == Some(&id) {
                    let alias = leaf.alias.clone();
                    self.aliases.remove(&alias);
                }
                Vec::new()
            }
            Node::Container(Container::Map(entries)) => entries.iter().map(|(_, c)| *c).collect(),
            Node::Container(Container::Seq { items, template }) => {
                let mut nested = items.clone();
                nested.extend(template.as_ref().map(|t| t.root));
                nested
            }
        };
        for child in nested {
            self.release(child);
        }
        self.free.push(id);
    }

    /// Rebuilds a declaration from the current tree state.
    pub(crate) fn to_declaration(&self, id: NodeId) -> Declaration {
        match self.node(id) {
            Node::Leaf(leaf) => Declaration::Descriptor(FieldSpec {
                field_type: leaf.field_type,
                default: Some(leaf.default.clone()),
                required: leaf.required,
                validator: leaf.validator.clone(),
                value: leaf.value.clone(),
            }),
            Node::Container(Container::Map(entries)) => Declaration::Map(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), self.to_declaration(*child)))
                    .collect(),
            ),
            Node::Container(Container::Seq { items, template }) => {
                match (items.is_empty(), template) {
                    (true, Some(t)) => Declaration::Seq(vec![self.to_declaration(t.root)]),
                    _ => Declaration::Seq(items.iter().map(|c| self.to_declaration(*c)).collect()),
                }
            }
        }
    }
}

/// Joins a parent alias and a key with `.`.
pub(crate) fn join_alias(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Replaces the `from` segment prefix of `alias` with `to`.
///
/// Only whole segments match: `items.1` does not rewrite `items.10.name`.
pub(crate) fn rewrite_alias(alias: &str, from: &str, to: &str) -> Option<String> {
    if alias == from {
        return Some(to.to_string());
    }
    alias
        .strip_prefix(from)
        .filter(|rest| rest.starts_with('.'))
        .map(|rest| format!("{}{}", to, rest))
}

/// Leaf for a scalar literal; its runtime type is the leaf type.
fn literal_leaf(value: Value, alias: &str) -> Leaf {
    let field_type = match &value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        Value::Array(_) => FieldType::Array,
        Value::Object(_) => FieldType::Object,
        Value::Date(_) => FieldType::Date,
        Value::String(_) | Value::Null => FieldType::String,
    };
    normalize_leaf(FieldSpec::new(field_type).default(value), alias)
}

/// Normalizes a descriptor. A default that does not fit the declared type is
/// replaced by the type's zero value.
fn normalize_leaf(spec: FieldSpec, alias: &str) -> Leaf {
    let default = match spec.default {
        Some(value) if spec.field_type.matches(&value) && !value.is_null() => value,
        Some(value) => {
            log_event_with_fields(
                Event::DefaultDiscarded,
                &[
                    ("alias", alias),
                    ("expected", spec.field_type.name()),
                    ("actual", value.runtime_type()),
                ],
            );
            spec.field_type.zero_value(spec.required)
        }
        None => spec.field_type.zero_value(spec.required),
    };
    Leaf {
        field_type: spec.field_type,
        default,
        value: spec.value.filter(|v| !v.is_null()),
        alias: alias.to_string(),
        required: spec.required,
        validator: spec.validator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_json(json: serde_json::Value) -> SchemaTree {
        SchemaTree::build(Declaration::from_json(&json))
    }

    #[test]
    fn test_aliases_follow_paths() {
        let tree = build_json(json!({
            "name": "",
            "address": {"city": "", "geo": {"lat": 0}},
            "tags": ["", ""]
        }));
        let mut aliases: Vec<_> = tree.aliases().collect();
        aliases.sort();
        assert_eq!(
            aliases,
            vec!["address.city", "address.geo.lat", "name", "tags.0", "tags.1"]
        );
    }

    #[test]
    fn test_null_entries_skipped() {
        let tree = build_json(json!({"a": null, "b": 1}));
        assert_eq!(tree.leaf_count(), 1);
        assert!(tree.leaf("a").is_none());
    }

    #[test]
    fn test_skipped_seq_entries_leave_no_gap() {
        let mut tree = build_json(json!({"tags": ["", null, ""]}));
        let mut aliases: Vec<_> = tree.aliases().collect();
        aliases.sort();
        assert_eq!(aliases, vec!["tags.0", "tags.1"]);

        tree.load(&Value::from(json!({"tags": ["a", "b", "c"]})));
        assert_eq!(tree.leaf("tags.1").unwrap().value(), Some(&Value::from("b")));
        assert_eq!(tree.extract(true).to_json(), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_literal_collections_are_containers() {
        let tree = SchemaTree::build(
            Declaration::map()
                .field("list", Value::from(json!(["a", 1])))
                .field("meta", Value::from(json!({"k": true, "gone": null}))),
        );
        let mut aliases: Vec<_> = tree.aliases().collect();
        aliases.sort();
        assert_eq!(aliases, vec!["list.0", "list.1", "meta.k"]);
        assert_eq!(tree.leaf("list.1").unwrap().field_type(), FieldType::Number);
        assert_eq!(tree.leaf("meta.k").unwrap().field_type(), FieldType::Boolean);
    }

    #[test]
    fn test_literal_default() {
        let tree = build_json(json!({"count": 5, "flag": true, "label": "x"}));
        let count = tree.leaf("count").unwrap();
        assert_eq!(count.field_type(), FieldType::Number);
        assert_eq!(count.default_value(), &Value::Number(5.0));
        assert_eq!(tree.leaf("flag").unwrap().field_type(), FieldType::Boolean);
        assert_eq!(tree.leaf("label").unwrap().default_value(), &Value::from("x"));
    }

    #[test]
    fn test_mismatched_default_replaced() {
        let tree = build_json(json!({"n": {"type": "Number", "default": "seven"}}));
        assert_eq!(tree.leaf("n").unwrap().default_value(), &Value::Number(0.0));
    }

    #[test]
    fn test_single_element_seq_has_template() {
        let tree = build_json(json!({"items": [{"sku": ""}], "pair": ["", ""]}));
        let root_children = tree.children(tree.root());
        let (_, items) = &root_children[0];
        let (_, pair) = &root_children[1];
        assert!(matches!(
            tree.node(*items),
            Node::Container(Container::Seq { template: Some(_), .. })
        ));
        assert!(matches!(
            tree.node(*pair),
            Node::Container(Container::Seq { template: None, .. })
        ));
        // The template copy is detached from the index.
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn test_repeated_key_replaces_entry() {
        let decl = Declaration::map()
            .field("a", FieldType::String)
            .field("a", FieldType::Number);
        let tree = SchemaTree::build(decl);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.leaf("a").unwrap().field_type(), FieldType::Number);
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn test_non_container_root_is_empty() {
        let tree = SchemaTree::build(Declaration::Type(FieldType::String));
        assert_eq!(tree.leaf_count(), 0);
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_rewrite_alias_whole_segments() {
        let rewritten = rewrite_alias("items.0.name", "items.0", "items.3");
        assert_eq!(rewritten, Some("items.3.name".into()));
        assert_eq!(rewrite_alias("items.0", "items.0", "items.3"), Some("items.3".into()));
        assert_eq!(rewrite_alias("items.00.name", "items.0", "items.3"), None);
        assert_eq!(rewrite_alias("other.0", "items.0", "items.3"), None);
    }

    #[test]
    fn test_release_frees_slots() {
        let mut tree = build_json(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        let children = tree.children(tree.root());
        let (a, d) = (children[0].1, children[1].1);
        tree.release(a);
        assert_eq!(tree.leaf_count(), 1);
        assert!(tree.leaf("a.b").is_none());

        // Freed slots are reused before the arena grows.
        let copy = tree.clone_subtree(d);
        assert_eq!(copy, a);
    }
}
