//! Stack definition parser.
//!
//! Decodes compose YAML into a [`StackDefinition`]. Only structural minimums are
//! checked here; per-field checks live in [`super::validate`].

use super::types::*;
use crate::error::{BerthError, Result};
use std::path::Path;
use tracing::{debug, instrument};

/// Parser for stack definition documents.
pub struct ComposeParser;

impl ComposeParser {
    /// Parse a stack definition from a string.
    ///
    /// # Errors
    ///
    /// Returns a validation error if:
    /// - The YAML is invalid
    /// - The document is not a mapping
    /// - The top-level `services` key is missing
    #[instrument(skip(content), fields(len = content.len()))]
    pub fn parse(content: &str) -> Result<StackDefinition> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| BerthError::validation(format!("document is not valid YAML: {}", e)))?;

        let Some(root) = document.as_mapping() else {
            return Err(BerthError::validation("document must be a mapping"));
        };

        if !root.contains_key("services") {
            return Err(BerthError::validation("missing top-level 'services' key"));
        }

        let definition: StackDefinition = serde_yaml::from_value(document)
            .map_err(|e| BerthError::validation(format!("cannot decode document: {}", e)))?;

        debug!(
            services = definition.services.len(),
            networks = definition.networks.len(),
            volumes = definition.volumes.len(),
            "Parsed stack definition"
        );

        Ok(definition)
    }

    /// Parse a stack definition from a file path.
    #[instrument]
    pub fn parse_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<StackDefinition> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BerthError::validation(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }
}
