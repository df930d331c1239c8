//! Engine configuration
//!
//! Settings shared by every `Fields` instance built through a factory:
//! which error template to instantiate, the default validation strategy and
//! whether extraction includes virtual fields by default.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldsError, FieldsResult, ValidationMode, VALIDATION_ERROR_KEY};

/// Field engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Registry key of the validation error template (default: "error_validation")
    #[serde(default = "default_error_key")]
    pub error_key: String,

    /// Strategy used by `Fields::check` (default: fail_fast)
    #[serde(default)]
    pub validation_mode: ValidationMode,

    /// Whether `Fields::extract_default` includes virtual fields (default: true)
    #[serde(default = "default_include_virtual")]
    pub include_virtual: bool,
}

fn default_error_key() -> String {
    VALIDATION_ERROR_KEY.to_string()
}

fn default_include_virtual() -> bool {
    true
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            error_key: default_error_key(),
            validation_mode: ValidationMode::default(),
            include_virtual: default_include_virtual(),
        }
    }
}

impl FieldsConfig {
    /// Parses a JSON configuration document; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `FieldsError::Json` on malformed JSON and
    /// `FieldsError::InvalidConfig` if `error_key` is blank.
    pub fn from_json(json: &str) -> FieldsResult<Self> {
        let config: FieldsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> FieldsResult<()> {
        if self.error_key.trim().is_empty() {
            return Err(FieldsError::InvalidConfig("error_key must not be empty".into()));
        }
        Ok(())
    }
}
