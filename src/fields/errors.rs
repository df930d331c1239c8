//! Field error types
//!
//! Two families:
//! - `ErrorObject`: validation failures, returned as values and never raised.
//!   Instantiated from a template looked up in an `ErrorTemplateProvider`.
//! - `FieldsError`: the few library calls that can genuinely fail
//!   (unknown alias, malformed configuration).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::types::FieldType;

/// Registry key of the validation error template.
pub const VALIDATION_ERROR_KEY: &str = "error_validation";

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Required leaf has no usable value
    Required,
    /// Value shape does not match the declared type
    Type,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::Type => "type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validation failure as handed to the calling application.
///
/// Serializes as `{type, name, dataType, msg, ...extra}`. Templates and
/// custom validators may carry any additional fields (e.g. `code`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Alias of the offending leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared type of the offending leaf
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<FieldType>,
    /// Human-readable message
    #[serde(default)]
    pub msg: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorObject {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Default::default()
        }
    }

    /// Adds an extra field, e.g. an application error code.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Template used when the registry has no entry for the requested key.
    pub fn fallback() -> Self {
        Self::new("Validation failed").with_field("code", 422)
    }

    /// Appends the kind-specific sentence naming the field.
    pub(crate) fn format_message(mut self) -> Self {
        let name = self.name.clone().unwrap_or_default();
        match self.kind {
            Some(ErrorKind::Required) => {
                self.msg = format!("{}, [{}] must not be empty", self.msg, name);
            }
            Some(ErrorKind::Type) => {
                let data_type = self.data_type.map(|t| t.name()).unwrap_or("unknown");
                self.msg = format!("{}, [{}] is not of type {}", self.msg, name, data_type);
            }
            None => {}
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "[{}] {}", kind, self.msg),
            None => write!(f, "{}", self.msg),
        }
    }
}

/// Keyed lookup of error templates, owned by the host application.
///
/// Returned templates are copied before being filled in, so providers may
/// hand out the same template repeatedly.
pub trait ErrorTemplateProvider: Send + Sync {
    fn error_template(&self, key: &str) -> Option<ErrorObject>;
}

/// In-memory template registry, seeded with the validation template.
#[derive(Debug, Clone)]
pub struct ErrorTemplates {
    templates: HashMap<String, ErrorObject>,
}

impl ErrorTemplates {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, template: ErrorObject) {
        self.templates.insert(key.into(), template);
    }

    pub fn with_template(mut self, key: impl Into<String>, template: ErrorObject) -> Self {
        self.insert(key, template);
        self
    }

    /// Parses a `{key: template}` JSON document.
    pub fn from_json(json: &str) -> FieldsResult<Self> {
        let templates: HashMap<String, ErrorObject> = serde_json::from_str(json)?;
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for ErrorTemplates {
    fn default() -> Self {
        Self::empty().with_template(VALIDATION_ERROR_KEY, ErrorObject::fallback())
    }
}

impl ErrorTemplateProvider for ErrorTemplates {
    fn error_template(&self, key: &str) -> Option<ErrorObject> {
        self.templates.get(key).cloned()
    }
}

/// Errors raised by fallible library calls.
#[derive(Debug, Error)]
pub enum FieldsError {
    #[error("Unknown field alias: {0}")]
    UnknownAlias(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldsError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FieldsError::UnknownAlias(_) => "FIELDS_UNKNOWN_ALIAS",
            FieldsError::InvalidConfig(_) => "FIELDS_INVALID_CONFIG",
            FieldsError::Json(_) => "FIELDS_MALFORMED_JSON",
        }
    }
}

/// Result type for field operations
pub type FieldsResult<T> = Result<T, FieldsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_message_format() {
        let mut err = ErrorObject::new("Validation failed");
        err.kind = Some(ErrorKind::Required);
        err.name = Some("user.name".into());
        err.data_type = Some(FieldType::String);
        let err = err.format_message();
        assert_eq!(err.msg, "Validation failed, [user.name] must not be empty");
    }

    #[test]
    fn test_type_message_format() {
        let mut err = ErrorObject::new("bad");
        err.kind = Some(ErrorKind::Type);
        err.name = Some("age".into());
        err.data_type = Some(FieldType::Number);
        assert_eq!(err.format_message().msg, "bad, [age] is not of type Number");
    }

    #[test]
    fn test_error_object_serialization() {
        let mut err = ErrorObject::fallback();
        err.kind = Some(ErrorKind::Type);
        err.name = Some("age".into());
        err.data_type = Some(FieldType::Number);

        let value = err.to_json();
        assert_eq!(value["type"], "type");
        assert_eq!(value["name"], "age");
        assert_eq!(value["dataType"], "Number");
        assert_eq!(value["code"], 422);
    }

    #[test]
    fn test_templates_from_json() {
        let templates = ErrorTemplates::from_json(
            r#"{"error_validation": {"msg": "Parameter error", "code": 1001}}"#,
        )
        .unwrap();
        let tpl = templates.error_template(VALIDATION_ERROR_KEY).unwrap();
        assert_eq!(tpl.msg, "Parameter error");
        assert_eq!(tpl.field("code"), Some(&json!(1001)));
        assert!(tpl.kind.is_none());
    }

    #[test]
    fn test_malformed_templates_rejected() {
        let err = ErrorTemplates::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), "FIELDS_MALFORMED_JSON");
    }

    #[test]
    fn test_default_registry_has_validation_template() {
        let templates = ErrorTemplates::default();
        assert_eq!(templates.len(), 1);
        assert!(templates.error_template(VALIDATION_ERROR_KEY).is_some());
        assert!(templates.error_template("missing").is_none());
    }
}
