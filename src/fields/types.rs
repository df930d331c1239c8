//! Field type and value definitions
//!
//! Supported leaf types:
//! - Number: 64-bit float (NaN marks a required number with no default)
//! - String: UTF-8 string
//! - Boolean: true/false
//! - Array: sequence of values
//! - Object: keyed mapping of values
//! - Date: UTC timestamp
//! - Virtual: computed/display-only field, never type checked

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::errors::ErrorObject;

/// The closed set of leaf type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Array,
    Object,
    Date,
    Virtual,
}

impl FieldType {
    /// All recognized tags, in declaration order.
    pub const ALL: [FieldType; 7] = [
        FieldType::Number,
        FieldType::String,
        FieldType::Boolean,
        FieldType::Array,
        FieldType::Object,
        FieldType::Date,
        FieldType::Virtual,
    ];

    /// Returns the tag as written in declarations and error objects
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Number => "Number",
            FieldType::String => "String",
            FieldType::Boolean => "Boolean",
            FieldType::Array => "Array",
            FieldType::Object => "Object",
            FieldType::Date => "Date",
            FieldType::Virtual => "Virtual",
        }
    }

    /// Parses a declaration tag. Tags are case-sensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == tag)
    }

    /// Returns the zero value used when a declaration omits `default`.
    ///
    /// A required `Number` without a default gets `NaN`, so that it reads as
    /// missing until data is loaded.
    pub fn zero_value(&self, required: bool) -> Value {
        match self {
            FieldType::Number if required => Value::Number(f64::NAN),
            FieldType::Number => Value::Number(0.0),
            FieldType::String | FieldType::Virtual => Value::String(String::new()),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Array => Value::Array(Vec::new()),
            FieldType::Object => Value::Object(BTreeMap::new()),
            FieldType::Date => Value::Date(Utc::now()),
        }
    }

    /// Whether `value`'s runtime shape is this type.
    ///
    /// Sequences only ever match `Array`; `Virtual` matches anything.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Virtual, _) => true,
            (FieldType::Array, v) => matches!(v, Value::Array(_)),
            (_, Value::Array(_)) => false,
            (FieldType::Date, v) => matches!(v, Value::Date(_)),
            (ty, v) => v.runtime_type().eq_ignore_ascii_case(ty.name()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An untyped runtime value held by a leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Date(DateTime<Utc>),
}

impl Value {
    /// Lowercase runtime type word: "null", "boolean", "number", "string",
    /// "array", "object" or "date".
    pub fn runtime_type(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
        }
    }

    /// Loose truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Date(_) => true,
        }
    }

    /// Whether an object-shaped value has no entries. Dates are never empty.
    pub fn is_structurally_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Looks up a child by key: object keys, or decimal indices into arrays.
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Converts to plain JSON. `NaN` becomes `null`, dates become RFC 3339.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            // Integral numbers stay integral in the output.
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from(&value)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Result of a custom validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Value accepted
    Valid,
    /// Appended to the message of a `required` error. An empty message is
    /// treated as valid.
    Message(String),
    /// Replaces the error object entirely
    Error(ErrorObject),
}

/// Custom per-leaf validator.
pub type Validator = Arc<dyn Fn(&Value) -> Verdict + Send + Sync>;

/// A terminal field of the schema tree.
#[derive(Clone)]
pub struct Leaf {
    pub(crate) field_type: FieldType,
    pub(crate) default: Value,
    pub(crate) value: Option<Value>,
    pub(crate) alias: String,
    pub(crate) required: bool,
    pub(crate) validator: Option<Validator>,
}

impl Leaf {
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// The assigned value, if data has been loaded into this leaf.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Dot-joined path from the tree root
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// Assigned value if present, else the default.
    pub fn effective_value(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// The value emitted on extraction.
    ///
    /// A falsy assigned value (`0`, `false`, `""`) falls back to the default.
    pub fn extracted_value(&self) -> &Value {
        match &self.value {
            Some(v) if v.is_truthy() => v,
            _ => &self.default,
        }
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("field_type", &self.field_type)
            .field("default", &self.default)
            .field("value", &self.value)
            .field("alias", &self.alias)
            .field("required", &self.required)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
