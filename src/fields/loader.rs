//! Data assignment into the schema tree
//!
//! Semantics:
//! - Only non-empty objects are loaded; anything else is a no-op
//! - Incoming values are assigned verbatim: no coercion, no validation
//! - `null` and absent keys leave the leaf untouched (partial update)
//! - A sequence arriving at a template container rebuilds the container
//!   with one clone of the template per incoming element

use super::tree::{join_alias, Container, Node, NodeId, SchemaTree, Template};
use super::types::Value;
use crate::observability::{log_event_with_fields, Event};

impl SchemaTree {
    /// Merges `target` into the tree. Returns the number of leaves assigned.
    pub(crate) fn load(&mut self, target: &Value) -> usize {
        match target {
            Value::Object(map) if !map.is_empty() => {
                let assigned = self.merge(self.root(), target);
                let assigned_str = assigned.to_string();
                log_event_with_fields(Event::DataLoaded, &[("assigned", assigned_str.as_str())]);
                assigned
            }
            _ => 0,
        }
    }

    fn merge(&mut self, id: NodeId, data: &Value) -> usize {
        let mut assigned = 0;
        for (key, child) in self.children(id) {
            let incoming = match data.child(&key) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };

            let template = match self.node_mut(child) {
                Node::Leaf(leaf) => {
                    leaf.value = Some(incoming.clone());
                    assigned += 1;
                    continue;
                }
                Node::Container(Container::Seq { template, .. }) => template.clone(),
                Node::Container(Container::Map(_)) => None,
            };

            assigned += match (template, incoming) {
                (Some(template), Value::Array(elements)) => self.expand(child, &template, elements),
                _ => self.merge(child, incoming),
            };
        }
        assigned
    }

    /// Replaces the items of a template sequence by one template clone per
    /// element, aliases re-indexed, each loaded with its element.
    fn expand(&mut self, seq: NodeId, template: &Template, elements: &[Value]) -> usize {
        let old_items = match self.node_mut(seq) {
            Node::Container(Container::Seq { items, .. }) => std::mem::take(items),
            _ => return 0,
        };
        for old in old_items {
            self.release(old);
        }

        let placeholder = join_alias(&template.base, "0");
        let mut assigned = 0;
        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let copy = self.clone_subtree(template.root);
            let alias = join_alias(&template.base, &index.to_string());
            self.rewrite_aliases(copy, &placeholder, &alias);

            match self.node_mut(copy) {
                Node::Leaf(leaf) => {
                    if !element.is_null() {
                        leaf.value = Some(element.clone());
                        assigned += 1;
                    }
                }
                Node::Container(_) => assigned += self.merge(copy, element),
            }
            self.register(copy);
            items.push(copy);
        }

        if let Node::Container(Container::Seq { items: slot, .. }) = self.node_mut(seq) {
            *slot = items;
        }

        let count = elements.len().to_string();
        log_event_with_fields(
            Event::TemplateExpanded,
            &[("alias", template.base.as_str()), ("items", count.as_str())],
        );
        assigned
    }
}
