//! Raw field declarations
//!
//! A leaf may be declared three ways, all normalizing to the same `Leaf`:
//! - a bare type (`Declaration::Type(FieldType::Date)`)
//! - a literal whose runtime type gives the tag and whose value is the default
//! - an explicit `FieldSpec` descriptor
//!
//! Anything else is a container: a keyed map or a sequence. A sequence of
//! exactly one element is a template for repeated items.

use std::sync::Arc;

use super::types::{FieldType, Validator, Value, Verdict};
use super::Fields;

/// Explicit leaf descriptor.
#[derive(Clone)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub default: Option<Value>,
    pub required: bool,
    pub validator: Option<Validator>,
    pub value: Option<Value>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            default: None,
            required: false,
            validator: None,
            value: None,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Verdict + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("field_type", &self.field_type)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("validator", &self.validator.is_some())
            .field("value", &self.value)
            .finish()
    }
}

/// A raw, possibly nested, declaration.
#[derive(Debug, Clone)]
pub enum Declaration {
    /// Absent entry, skipped by the builder
    Undefined,
    /// Bare type reference
    Type(FieldType),
    /// Literal default; its runtime type is the leaf type. Array and object
    /// literals are built as containers of literals.
    Literal(Value),
    /// Explicit descriptor
    Descriptor(FieldSpec),
    /// Keyed container, in declaration order
    Map(Vec<(String, Declaration)>),
    /// Sequence container
    Seq(Vec<Declaration>),
    /// A previously built engine, flattened into its current leaves
    Tree(Box<Fields>),
}

impl Declaration {
    /// Starts an empty keyed container.
    pub fn map() -> Self {
        Declaration::Map(Vec::new())
    }

    /// Adds an entry to a keyed container. No-op on other variants.
    pub fn field(mut self, key: impl Into<String>, decl: impl Into<Declaration>) -> Self {
        if let Declaration::Map(entries) = &mut self {
            entries.push((key.into(), decl.into()));
        }
        self
    }

    /// A one-element sequence: the template of a repeated item.
    pub fn template(item: impl Into<Declaration>) -> Self {
        Declaration::Seq(vec![item.into()])
    }

    /// Interprets a JSON document as a declaration.
    ///
    /// Objects whose `"type"` is a recognized tag are descriptors; other
    /// objects and arrays are containers; `null` is skipped.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Declaration::Undefined,
            serde_json::Value::Object(map) => {
                let tag = map
                    .get("type")
                    .and_then(|t| t.as_str())
                    .and_then(FieldType::from_tag);
                match tag {
                    Some(field_type) => {
                        let mut spec = FieldSpec::new(field_type);
                        spec.default = map.get("default").filter(|v| !v.is_null()).map(Value::from);
                        spec.value = map.get("value").filter(|v| !v.is_null()).map(Value::from);
                        spec.required =
                            map.get("required").and_then(|v| v.as_bool()).unwrap_or(false);
                        Declaration::Descriptor(spec)
                    }
                    None => Declaration::Map(
                        map.iter()
                            .map(|(k, v)| (k.clone(), Declaration::from_json(v)))
                            .collect(),
                    ),
                }
            }
            serde_json::Value::Array(items) => {
                Declaration::Seq(items.iter().map(Declaration::from_json).collect())
            }
            scalar => Declaration::Literal(Value::from(scalar)),
        }
    }
}

impl From<FieldType> for Declaration {
    fn from(field_type: FieldType) -> Self {
        Declaration::Type(field_type)
    }
}

impl From<FieldSpec> for Declaration {
    fn from(spec: FieldSpec) -> Self {
        Declaration::Descriptor(spec)
    }
}

impl From<Value> for Declaration {
    fn from(value: Value) -> Self {
        Declaration::Literal(value)
    }
}

impl From<&str> for Declaration {
    fn from(s: &str) -> Self {
        Declaration::Literal(Value::from(s))
    }
}

impl From<f64> for Declaration {
    fn from(n: f64) -> Self {
        Declaration::Literal(Value::Number(n))
    }
}

impl From<bool> for Declaration {
    fn from(b: bool) -> Self {
        Declaration::Literal(Value::Bool(b))
    }
}

impl From<Fields> for Declaration {
    fn from(fields: Fields) -> Self {
        Declaration::Tree(Box::new(fields))
    }
}
