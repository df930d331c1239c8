//! Observable events of the field engine
//!
//! Events are explicit and typed. Each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in the field engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Construction
    /// Declaration normalized into a tree
    TreeBuilt,
    /// Declared default did not fit the declared type and was replaced
    DefaultDiscarded,

    // Data
    /// Data merged into the tree
    DataLoaded,
    /// Template container rebuilt from incoming items
    TemplateExpanded,
    /// Assigned values cleared
    FieldsReset,

    // Validation
    /// Validation reported at least one failure
    ValidationFailed,
    /// Error template missing from the registry, fallback used
    ErrorTemplateMissing,

    // Host
    /// Engine registered on the host application
    PluginInstalled,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TreeBuilt => "FIELDS_TREE_BUILT",
            Event::DefaultDiscarded => "FIELDS_DEFAULT_DISCARDED",
            Event::DataLoaded => "FIELDS_DATA_LOADED",
            Event::TemplateExpanded => "FIELDS_TEMPLATE_EXPANDED",
            Event::FieldsReset => "FIELDS_RESET",
            Event::ValidationFailed => "FIELDS_VALIDATION_FAILED",
            Event::ErrorTemplateMissing => "FIELDS_ERROR_TEMPLATE_MISSING",
            Event::PluginInstalled => "FIELDS_PLUGIN_INSTALLED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DefaultDiscarded | Event::ErrorTemplateMissing => Severity::Warn,
            Event::PluginInstalled => Severity::Info,
            Event::ValidationFailed => Severity::Debug,
            _ => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
