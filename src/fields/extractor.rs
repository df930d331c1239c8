//! Extraction of plain values from the schema tree
//!
//! Leaves emit their assigned value, or the default when the assigned value
//! is falsy or absent. Containers become fresh objects/arrays mirroring the
//! tree shape. Virtual leaves can be omitted: dropped from objects, `null`
//! in arrays so positions still match aliases.

use std::collections::BTreeMap;

use super::tree::{Container, Node, NodeId, SchemaTree};
use super::types::{FieldType, Value};
use crate::observability::{log_event_with_fields, Event};

/// Which value a leaf contributes to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Current,
    Defaults,
}

impl SchemaTree {
    /// Produces an independent plain value from the current leaf values.
    pub(crate) fn extract(&self, include_virtual: bool) -> Value {
        self.extract_node(self.root(), include_virtual, Source::Current)
            .unwrap_or_else(|| Value::Object(BTreeMap::new()))
    }

    /// Produces the all-defaults value without touching the tree.
    pub(crate) fn defaults_snapshot(&self) -> Value {
        self.extract_node(self.root(), true, Source::Defaults)
            .unwrap_or_else(|| Value::Object(BTreeMap::new()))
    }

    /// Clears every assigned value, so each leaf reads its default again.
    /// Returns the resulting all-defaults value.
    pub(crate) fn reset(&mut self) -> Value {
        let mut cleared = 0usize;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            match self.node_mut(id) {
                Node::Leaf(leaf) => {
                    if leaf.value.take().is_some() {
                        cleared += 1;
                    }
                }
                Node::Container(_) => stack.extend(self.children(id).into_iter().map(|(_, c)| c)),
            }
        }

        let cleared = cleared.to_string();
        log_event_with_fields(Event::FieldsReset, &[("cleared", cleared.as_str())]);
        self.defaults_snapshot()
    }

    fn extract_node(&self, id: NodeId, include_virtual: bool, source: Source) -> Option<Value> {
        match self.node(id) {
            Node::Leaf(leaf) => {
                if !include_virtual && leaf.field_type == FieldType::Virtual {
                    return None;
                }
                Some(match source {
                    Source::Current => leaf.extracted_value().clone(),
                    Source::Defaults => leaf.default.clone(),
                })
            }
            Node::Container(Container::Map(entries)) => Some(Value::Object(
                entries
                    .iter()
                    .filter_map(|(key, child)| {
                        self.extract_node(*child, include_virtual, source)
                            .map(|v| (key.clone(), v))
                    })
                    .collect(),
            )),
            // Omitted items become `null` so later items keep their index.
            Node::Container(Container::Seq { items, .. }) => Some(Value::Array(
                items
                    .iter()
                    .map(|child| {
                        self.extract_node(*child, include_virtual, source)
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::declaration::Declaration;
    use super::*;
    use serde_json::json;

    fn tree(json: serde_json::Value) -> SchemaTree {
        SchemaTree::build(Declaration::from_json(&json))
    }

    #[test]
    fn test_extract_defaults() {
        let t = tree(json!({"name": "anon", "n": 3, "nested": {"flag": true}, "list": ["a", "b"]}));
        assert_eq!(
            t.extract(true).to_json(),
            json!({"name": "anon", "n": 3, "nested": {"flag": true}, "list": ["a", "b"]})
        );
    }

    #[test]
    fn test_extract_prefers_value() {
        let mut t = tree(json!({"name": "anon"}));
        t.load(&Value::from(json!({"name": "Ann"})));
        assert_eq!(t.extract(true).to_json(), json!({"name": "Ann"}));
    }

    #[test]
    fn test_falsy_value_falls_back_to_default() {
        let mut t = tree(json!({"n": 3, "s": "dflt", "b": true}));
        t.load(&Value::from(json!({"n": 0, "s": "", "b": false})));
        assert_eq!(t.extract(true).to_json(), json!({"n": 3, "s": "dflt", "b": true}));
    }

    #[test]
    fn test_virtual_filtering() {
        let t = tree(json!({"name": "", "label": {"type": "Virtual", "default": "shown"}}));
        assert_eq!(t.extract(true).to_json(), json!({"name": "", "label": "shown"}));
        assert_eq!(t.extract(false).to_json(), json!({"name": ""}));
    }

    #[test]
    fn test_virtual_seq_item_keeps_position() {
        let t = SchemaTree::build(Declaration::map().field(
            "s",
            Declaration::Seq(vec![FieldType::Virtual.into(), "x".into()]),
        ));
        assert_eq!(t.extract(false).to_json(), json!({"s": [null, "x"]}));
        assert_eq!(t.extract(true).to_json(), json!({"s": ["", "x"]}));
    }

    #[test]
    fn test_reset_clears_values() {
        let mut t = tree(json!({"name": "anon", "inner": {"n": 1}}));
        t.load(&Value::from(json!({"name": "Ann", "inner": {"n": 9}})));
        let snapshot = t.reset();
        assert_eq!(snapshot.to_json(), json!({"name": "anon", "inner": {"n": 1}}));
        assert!(t.leaf("name").unwrap().value().is_none());
        assert_eq!(t.extract(true), snapshot);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut t = tree(json!({"name": "anon"}));
        t.load(&Value::from(json!({"name": "Ann"})));
        assert_eq!(t.defaults_snapshot().to_json(), json!({"name": "anon"}));
        assert_eq!(t.leaf("name").unwrap().value(), Some(&Value::from("Ann")));
    }
}
