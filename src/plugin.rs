//! Host application registration
//!
//! The engine is installed once, as a named capability, on a shared
//! application object. The installed `FieldsFactory` carries the host's
//! error templates and configuration into every engine it builds.

use std::fmt;
use std::sync::Arc;

use crate::config::FieldsConfig;
use crate::fields::{Declaration, ErrorTemplateProvider, Fields};
use crate::observability::{log_event_with_fields, Event};

/// Name under which the factory is registered on the host.
pub const PLUGIN_NAME: &str = "Fields";

/// An application object that accepts named capabilities.
pub trait PluginHost {
    fn add_app_prop(&mut self, name: &str, factory: FieldsFactory);
}

/// Builds `Fields` engines sharing one provider and configuration.
#[derive(Clone)]
pub struct FieldsFactory {
    templates: Arc<dyn ErrorTemplateProvider>,
    config: FieldsConfig,
}

impl FieldsFactory {
    pub fn new(templates: Arc<dyn ErrorTemplateProvider>, config: FieldsConfig) -> Self {
        Self { templates, config }
    }

    pub fn config(&self) -> &FieldsConfig {
        &self.config
    }

    /// Builds an engine for `declaration`.
    pub fn build(&self, declaration: impl Into<Declaration>) -> Fields {
        Fields::with_provider(declaration, Arc::clone(&self.templates), self.config.clone())
    }

    /// Builds an engine from a JSON declaration.
    pub fn build_json(&self, json: &serde_json::Value) -> Fields {
        self.build(Declaration::from_json(json))
    }
}

impl fmt::Debug for FieldsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldsFactory")
            .field("config", &self.config)
            .finish()
    }
}

/// Registers the engine on `host` under [`PLUGIN_NAME`] and returns the
/// factory for direct use.
pub fn install<H: PluginHost>(
    host: &mut H,
    templates: Arc<dyn ErrorTemplateProvider>,
    config: FieldsConfig,
) -> FieldsFactory {
    let factory = FieldsFactory::new(templates, config);
    host.add_app_prop(PLUGIN_NAME, factory.clone());
    log_event_with_fields(Event::PluginInstalled, &[("name", PLUGIN_NAME)]);
    factory
}
