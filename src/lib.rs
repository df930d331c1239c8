//! fieldtree - A schema-driven data normalization and validation engine
//!
//! A declaration is normalized into a tree of typed leaves once, at
//! construction. The tree then loads external data, validates it, and
//! extracts it back into a plain nested value.

pub mod config;
pub mod fields;
pub mod observability;
pub mod plugin;

pub use config::FieldsConfig;
pub use fields::{
    Declaration, ErrorKind, ErrorObject, ErrorTemplateProvider, ErrorTemplates, Fields,
    FieldsError, FieldsResult, FieldSpec, FieldType, Leaf, ValidationMode, Value, Verdict,
};
pub use plugin::{install, FieldsFactory, PluginHost};
