//! Leaf validation
//!
//! Per leaf, in order:
//! 1. Effective value = assigned value, else default
//! 2. Required leaves fail with `required` when the value is missing:
//!    `NaN`, `""`, `null`, or an empty array/object. Booleans and dates are
//!    never missing.
//! 3. Required, non-`Virtual` leaves fail with `type` when the value's
//!    runtime shape differs from the declared type. Optional leaves are not
//!    type checked.
//! 4. A custom validator may accept, append a message, or replace the error
//!
//! The walk is depth-first in declaration order. Validation never mutates
//! the tree and never fails; failures are returned as values.

use serde::{Deserialize, Serialize};

use super::errors::{ErrorKind, ErrorObject, ErrorTemplateProvider};
use super::tree::{Node, NodeId, SchemaTree};
use super::types::{FieldType, Leaf, Value, Verdict};
use crate::observability::{log_event_with_fields, Event};

/// How many failures a validation pass reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Stop at the first failing leaf
    #[default]
    FailFast,
    /// Report one failure per failing leaf
    CollectAll,
}

/// Validates a schema tree against its leaf rules.
pub(crate) struct TreeValidator<'a> {
    tree: &'a SchemaTree,
    templates: &'a dyn ErrorTemplateProvider,
    error_key: &'a str,
}

impl<'a> TreeValidator<'a> {
    pub(crate) fn new(
        tree: &'a SchemaTree,
        templates: &'a dyn ErrorTemplateProvider,
        error_key: &'a str,
    ) -> Self {
        Self {
            tree,
            templates,
            error_key,
        }
    }

    /// Walks the tree, collecting failures according to `mode`.
    pub(crate) fn validate(&self, mode: ValidationMode) -> Vec<ErrorObject> {
        let mut errors = Vec::new();
        self.walk(self.tree.root(), mode, &mut errors);

        if let Some(first) = errors.first() {
            let count = errors.len().to_string();
            let name = first.name.clone().unwrap_or_default();
            log_event_with_fields(
                Event::ValidationFailed,
                &[("errors", count.as_str()), ("first", name.as_str())],
            );
        }
        errors
    }

    /// Returns `false` once the walk must stop.
    fn walk(&self, id: NodeId, mode: ValidationMode, errors: &mut Vec<ErrorObject>) -> bool {
        match self.tree.node(id) {
            Node::Leaf(leaf) => {
                if let Some(err) = self.validate_leaf(leaf) {
                    errors.push(err);
                    return mode == ValidationMode::CollectAll;
                }
                true
            }
            Node::Container(_) => self
                .tree
                .children(id)
                .into_iter()
                .all(|(_, child)| self.walk(child, mode, errors)),
        }
    }

    fn validate_leaf(&self, leaf: &Leaf) -> Option<ErrorObject> {
        let value = leaf.effective_value();

        if leaf.required {
            if is_missing(value) {
                return Some(self.error(leaf, ErrorKind::Required).format_message());
            }
            if leaf.field_type != FieldType::Virtual && !leaf.field_type.matches(value) {
                return Some(self.error(leaf, ErrorKind::Type).format_message());
            }
        }

        match leaf.validator.as_ref().map(|check| (**check)(value)) {
            None | Some(Verdict::Valid) => None,
            Some(Verdict::Message(msg)) if msg.is_empty() => None,
            Some(Verdict::Message(msg)) => {
                let mut err = self.error(leaf, ErrorKind::Required);
                err.msg = format!("{}, {}", err.msg, msg);
                Some(err)
            }
            Some(Verdict::Error(err)) => Some(err),
        }
    }

    /// Instantiates the validation template for `leaf`.
    fn error(&self, leaf: &Leaf, kind: ErrorKind) -> ErrorObject {
        let mut err = self
            .templates
            .error_template(self.error_key)
            .unwrap_or_else(|| {
                log_event_with_fields(Event::ErrorTemplateMissing, &[("key", self.error_key)]);
                ErrorObject::fallback()
            });
        err.kind = Some(kind);
        err.name = Some(leaf.alias.clone());
        err.data_type = Some(leaf.field_type);
        err
    }
}

/// Whether a required leaf's value counts as absent.
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_nan(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Date(_) => false,
        other => other.is_structurally_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::declaration::{Declaration, FieldSpec};
    use super::super::errors::{ErrorTemplates, VALIDATION_ERROR_KEY};
    use super::*;
    use serde_json::json;

    fn run(tree: &SchemaTree, mode: ValidationMode) -> Vec<ErrorObject> {
        let templates = ErrorTemplates::default();
        TreeValidator::new(tree, &templates, VALIDATION_ERROR_KEY).validate(mode)
    }

    fn first(tree: &SchemaTree) -> Option<ErrorObject> {
        run(tree, ValidationMode::FailFast).into_iter().next()
    }

    #[test]
    fn test_required_string_missing() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "user": {"name": {"type": "String", "required": true}}
        })));
        let err = first(&tree).unwrap();
        assert_eq!(err.kind, Some(ErrorKind::Required));
        assert_eq!(err.name.as_deref(), Some("user.name"));
        assert_eq!(err.data_type, Some(FieldType::String));
        assert!(err.msg.ends_with("[user.name] must not be empty"));
    }

    #[test]
    fn test_required_number_without_default_is_missing() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "qty": {"type": "Number", "required": true}
        })));
        assert_eq!(first(&tree).unwrap().kind, Some(ErrorKind::Required));
    }

    #[test]
    fn test_required_zero_is_present() {
        let mut tree = SchemaTree::build(Declaration::from_json(&json!({
            "qty": {"type": "Number", "required": true}
        })));
        tree.load(&Value::from(json!({"qty": 0})));
        assert!(first(&tree).is_none());
    }

    #[test]
    fn test_required_boolean_never_missing() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "flag": {"type": "Boolean", "required": true}
        })));
        assert!(first(&tree).is_none());
    }

    #[test]
    fn test_required_empty_containers() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "list": {"type": "Array", "required": true},
            "meta": {"type": "Object", "required": true}
        })));
        let errors = run(&tree, ValidationMode::CollectAll);
        let names: Vec<_> = errors.iter().filter_map(|e| e.name.as_deref()).collect();
        assert_eq!(names, vec!["list", "meta"]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut tree = SchemaTree::build(Declaration::from_json(&json!({
            "age": {"type": "Number", "required": true}
        })));
        tree.load(&Value::from(json!({"age": "old"})));
        let err = first(&tree).unwrap();
        assert_eq!(err.kind, Some(ErrorKind::Type));
        assert!(err.msg.ends_with("[age] is not of type Number"));
    }

    #[test]
    fn test_optional_mismatch_not_type_checked() {
        let mut tree = SchemaTree::build(Declaration::from_json(&json!({"age": 0})));
        tree.load(&Value::from(json!({"age": "forty"})));
        assert!(first(&tree).is_none());
    }

    #[test]
    fn test_sequence_only_matches_array() {
        let mut tree = SchemaTree::build(Declaration::from_json(&json!({
            "meta": {"type": "Object", "required": true}
        })));
        tree.load(&Value::from(json!({"meta": [1]})));
        assert_eq!(first(&tree).unwrap().kind, Some(ErrorKind::Type));
    }

    #[test]
    fn test_date_requires_date_value() {
        let mut tree = SchemaTree::build(
            Declaration::map().field("at", FieldSpec::new(FieldType::Date).required(true)),
        );
        assert!(first(&tree).is_none());
        tree.load(&Value::from(json!({"at": "2024-01-01"})));
        assert_eq!(first(&tree).unwrap().kind, Some(ErrorKind::Type));
    }

    #[test]
    fn test_virtual_skips_type_check() {
        let mut tree = SchemaTree::build(
            Declaration::map().field("label", FieldSpec::new(FieldType::Virtual).required(true)),
        );
        tree.load(&Value::from(json!({"label": 42})));
        assert!(first(&tree).is_none());
    }

    #[test]
    fn test_validator_message_appended() {
        let decl = Declaration::map().field(
            "code",
            FieldSpec::new(FieldType::String).default("abc").validator(|v| {
                if v.as_str().map_or(0, str::len) < 5 {
                    Verdict::Message("code too short".into())
                } else {
                    Verdict::Valid
                }
            }),
        );
        let tree = SchemaTree::build(decl);
        let err = first(&tree).unwrap();
        assert_eq!(err.kind, Some(ErrorKind::Required));
        assert_eq!(err.msg, "Validation failed, code too short");
    }

    #[test]
    fn test_validator_empty_message_is_valid() {
        let decl = Declaration::map().field(
            "code",
            FieldSpec::new(FieldType::String).validator(|_| Verdict::Message(String::new())),
        );
        assert!(first(&SchemaTree::build(decl)).is_none());
    }

    #[test]
    fn test_validator_error_replaces_object() {
        let custom = ErrorObject::new("custom").with_field("code", 7);
        let returned = custom.clone();
        let decl = Declaration::map().field(
            "x",
            FieldSpec::new(FieldType::String).validator(move |_| Verdict::Error(returned.clone())),
        );
        assert_eq!(first(&SchemaTree::build(decl)), Some(custom));
    }

    #[test]
    fn test_fail_fast_stops_at_first() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "a": {"type": "String", "required": true},
            "b": {"type": "String", "required": true}
        })));
        let fail_fast = run(&tree, ValidationMode::FailFast);
        assert_eq!(fail_fast.len(), 1);
        assert_eq!(fail_fast[0].name.as_deref(), Some("a"));
        assert_eq!(run(&tree, ValidationMode::CollectAll).len(), 2);
    }

    #[test]
    fn test_missing_template_falls_back() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "a": {"type": "String", "required": true}
        })));
        let templates = ErrorTemplates::empty();
        let errors =
            TreeValidator::new(&tree, &templates, "nope").validate(ValidationMode::FailFast);
        assert_eq!(errors[0].field("code"), Some(&json!(422)));
    }

    #[test]
    fn test_custom_template_used() {
        let tree = SchemaTree::build(Declaration::from_json(&json!({
            "a": {"type": "String", "required": true}
        })));
        let templates = ErrorTemplates::empty()
            .with_template("bad_param", ErrorObject::new("Bad parameter").with_field("code", 4001));
        let errors =
            TreeValidator::new(&tree, &templates, "bad_param").validate(ValidationMode::FailFast);
        assert_eq!(errors[0].msg, "Bad parameter, [a] must not be empty");
        assert_eq!(errors[0].field("code"), Some(&json!(4001)));
    }
}
