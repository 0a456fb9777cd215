//! Engine configuration
//!
//! Configuration is JSON. Every field is optional:
//!
//! ```json
//! {
//!   "max_recursion_depth": 32,
//!   "shapes": {
//!     "UserId": { "kind": "Value", "primitive": "i32" },
//!     "Tree":   { "kind": "List",  "items": "Tree" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_MAX_RECURSION_DEPTH;
use crate::error::{Error, Result};
use crate::shape::{ShapeKind, ShapeName, ShapeRegistry};

/// Settings for a [`crate::engine::MappingEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    /// Maximum nesting depth of a single build
    pub max_recursion_depth: usize,
    /// Named shape declarations
    pub shapes:              BTreeMap<ShapeName, ShapeKind>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            shapes:              BTreeMap::new(),
        }
    }
}

impl MapperConfig {
    /// Parse configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` for malformed JSON, unknown fields, or a zero recursion depth.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Report::new(Error::invalid("configuration", e)))?;
        if config.max_recursion_depth == 0 {
            return Err(Report::new(Error::invalid(
                "configuration",
                "max_recursion_depth must be at least 1",
            )));
        }
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Report::new(Error::failed_to(
                "read config file",
                format!("{}: {e}", path.display()),
            ))
        })?;
        let config = Self::from_json(&contents)
            .change_context_lazy(|| Error::failed_to("load config", path.display()))?;
        debug!(
            path = %path.display(),
            shapes = config.shapes.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Declare a named shape
    #[must_use]
    pub fn with_shape(mut self, name: impl Into<ShapeName>, kind: ShapeKind) -> Self {
        self.shapes.insert(name.into(), kind);
        self
    }

    /// Build the shape registry described by this configuration
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` when a declaration is invalid or refers to an unknown shape.
    pub fn registry(&self) -> Result<ShapeRegistry> {
        ShapeRegistry::from_declarations(
            self.shapes
                .iter()
                .map(|(name, kind)| (name.clone(), kind.clone())),
        )
        .change_context(Error::invalid("configuration", "shape declarations rejected"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::shape::Primitive;

    #[test]
    fn empty_config_uses_defaults() {
        let config = MapperConfig::from_json("{}").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(config.max_recursion_depth, DEFAULT_MAX_RECURSION_DEPTH);
    }

    #[test]
    fn shapes_deserialize_into_a_registry() {
        let config = MapperConfig::from_json(
            r#"{
                "max_recursion_depth": 8,
                "shapes": {
                    "UserId": { "kind": "Value", "primitive": "i32" },
                    "Tree": { "kind": "List", "items": "Tree" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_recursion_depth, 8);
        let registry = config.registry().unwrap();
        assert_eq!(registry.declared_len(), 2);
        assert_eq!(
            registry.kind_of(&ShapeName::from("UserId")).unwrap(),
            ShapeKind::Value {
                primitive: Primitive::I32,
            }
        );
    }

    #[test]
    fn unknown_fields_and_zero_depth_are_rejected() {
        let report = MapperConfig::from_json(r#"{ "depth": 3 }"#).unwrap_err();
        assert!(matches!(report.current_context(), Error::Configuration(_)));

        let report = MapperConfig::from_json(r#"{ "max_recursion_depth": 0 }"#).unwrap_err();
        assert!(matches!(report.current_context(), Error::Configuration(_)));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let config = MapperConfig::default().with_shape(
            "Orphans",
            ShapeKind::List {
                items: ShapeName::from("Missing"),
            },
        );
        let report = config.registry().unwrap_err();
        assert!(matches!(report.current_context(), Error::Configuration(_)));
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "shapes": {{ "Ids": {{ "kind": "Array", "items": "i64" }} }} }}"#
        )
        .unwrap();

        let config = MapperConfig::load(file.path()).unwrap();
        assert!(config.shapes.contains_key(&ShapeName::from("Ids")));
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = MapperConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(report.current_context(), Error::Configuration(_)));
    }
}
