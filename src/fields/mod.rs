//! Field tree subsystem
//!
//! A `Fields` instance owns one schema tree, normalized once from a
//! declaration, and exposes four operations over it:
//!
//! - `load`: merge plain data into leaf values, expanding templates
//! - `validate`: report the first (or every) failing leaf
//! - `extract`: produce a plain nested value
//! - `reset`: drop assigned values so every leaf reads its default
//!
//! Instances are single-owner and synchronous; share one per request.

mod declaration;
mod errors;
mod extractor;
mod loader;
mod tree;
mod types;
mod validator;

pub use declaration::{Declaration, FieldSpec};
pub use errors::{
    ErrorKind, ErrorObject, ErrorTemplateProvider, ErrorTemplates, FieldsError, FieldsResult,
    VALIDATION_ERROR_KEY,
};
pub use types::{FieldType, Leaf, Validator, Value, Verdict};
pub use validator::ValidationMode;

use std::fmt;
use std::sync::Arc;

use crate::config::FieldsConfig;
use tree::SchemaTree;
use validator::TreeValidator;

/// A normalized field tree with its error-template provider.
#[derive(Clone)]
pub struct Fields {
    tree: SchemaTree,
    templates: Arc<dyn ErrorTemplateProvider>,
    config: FieldsConfig,
}

impl Fields {
    /// Builds a tree using the stock error templates and default config.
    pub fn new(declaration: impl Into<Declaration>) -> Self {
        Self::with_provider(
            declaration,
            Arc::new(ErrorTemplates::default()),
            FieldsConfig::default(),
        )
    }

    /// Builds a tree with an injected error-template provider.
    pub fn with_provider(
        declaration: impl Into<Declaration>,
        templates: Arc<dyn ErrorTemplateProvider>,
        config: FieldsConfig,
    ) -> Self {
        Self {
            tree: SchemaTree::build(declaration.into()),
            templates,
            config,
        }
    }

    /// Builds a tree from a JSON declaration.
    pub fn from_json(json: &serde_json::Value) -> Self {
        Self::new(Declaration::from_json(json))
    }

    pub fn config(&self) -> &FieldsConfig {
        &self.config
    }

    /// Looks up a leaf by its alias.
    pub fn leaf(&self, alias: &str) -> Option<&Leaf> {
        self.tree.leaf(alias)
    }

    pub fn leaf_mut(&mut self, alias: &str) -> Option<&mut Leaf> {
        self.tree.leaf_mut(alias)
    }

    /// Aliases of all live leaves, in no particular order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.tree.aliases()
    }

    pub fn len(&self) -> usize {
        self.tree.leaf_count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.leaf_count() == 0
    }

    /// Assigns a single leaf by alias.
    ///
    /// # Errors
    ///
    /// Returns `FieldsError::UnknownAlias` if no live leaf has `alias`.
    pub fn set_value(&mut self, alias: &str, value: impl Into<Value>) -> FieldsResult<()> {
        let leaf = self
            .tree
            .leaf_mut(alias)
            .ok_or_else(|| FieldsError::UnknownAlias(alias.to_string()))?;
        leaf.set_value(value);
        Ok(())
    }

    /// Merges `target` into the tree. Non-objects and empty objects are
    /// ignored. Returns the number of leaves assigned.
    pub fn load(&mut self, target: &Value) -> usize {
        self.tree.load(target)
    }

    /// Merges a JSON document into the tree.
    pub fn load_json(&mut self, target: &serde_json::Value) -> usize {
        self.tree.load(&Value::from(target))
    }

    /// Returns the first validation failure, depth-first in declaration order.
    pub fn validate(&self) -> Option<ErrorObject> {
        self.validate_with(ValidationMode::FailFast).into_iter().next()
    }

    /// Returns every validation failure, one per failing leaf.
    pub fn validate_all(&self) -> Vec<ErrorObject> {
        self.validate_with(ValidationMode::CollectAll)
    }

    /// Validates under the given strategy.
    pub fn validate_with(&self, mode: ValidationMode) -> Vec<ErrorObject> {
        TreeValidator::new(&self.tree, self.templates.as_ref(), &self.config.error_key)
            .validate(mode)
    }

    /// Validates under the configured strategy.
    pub fn check(&self) -> Vec<ErrorObject> {
        self.validate_with(self.config.validation_mode)
    }

    /// Produces a plain value from the current leaf values.
    pub fn extract(&self, include_virtual: bool) -> Value {
        self.tree.extract(include_virtual)
    }

    /// Extracts with the configured `include_virtual` setting.
    pub fn extract_default(&self) -> Value {
        self.extract(self.config.include_virtual)
    }

    pub fn to_json(&self, include_virtual: bool) -> serde_json::Value {
        self.extract(include_virtual).to_json()
    }

    /// Clears every assigned value and returns the all-defaults value.
    pub fn reset(&mut self) -> Value {
        self.tree.reset()
    }

    /// The all-defaults value, without clearing anything.
    pub fn defaults(&self) -> Value {
        self.tree.defaults_snapshot()
    }

    /// Rebuilds a declaration from the current state, for reuse as a
    /// sub-tree of another declaration.
    pub fn to_declaration(&self) -> Declaration {
        self.tree.to_declaration(self.tree.root())
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fields")
            .field("leaves", &self.tree.leaf_count())
            .field("config", &self.config)
            .finish()
    }
}
