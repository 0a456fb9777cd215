//! Mapper runtime contract
//!
//! Every compiled converter implements [`Mapper`]. Mappers never hold each other directly: a
//! mapper that needs a child stores the child's [`Address`] and looks it up in the frozen
//! [`MapperTable`] of its build, which keeps self-referential graphs free of ownership cycles.
//!
//! [`CompiledMapper`] is the handle returned to callers: the root address plus the table.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::cache::{Address, MapperTable};
use crate::error::Result;
use crate::shape::ShapeRegistry;
use crate::type_pair::TypePair;
use crate::value::Value;

/// Number of uuid characters kept in a generated mapper name
const NAME_SUFFIX_LEN: usize = 8;

/// Executable conversion for one [`TypePair`]
pub trait Mapper: std::fmt::Debug + Send + Sync {
    /// Unique name of this mapper
    fn name(&self) -> &MapperName;

    /// The conversion this mapper performs
    fn type_pair(&self) -> &TypePair;

    /// Convert `source` into a newly constructed target value
    ///
    /// `mappers` is the table of the build this mapper belongs to; children are looked up in it
    /// by address. `source` must conform to the source shape.
    fn map(&self, source: &Value, mappers: &MapperTable) -> Value;
}

/// Unique, human-readable mapper name scoped under its builder's category
///
/// Formatted as `{scope}.{source}To{target}_{suffix}`, for example
/// `CollectionMappers.Seq<i64>ToVec<String>_1f0c9a2b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MapperName(String);

impl MapperName {
    /// Generate a fresh name for a mapper converting `pair` under `scope`
    #[must_use]
    pub fn generate(scope: &str, pair: &TypePair) -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(NAME_SUFFIX_LEN)
            .collect();
        Self(format!(
            "{scope}.{}To{}_{suffix}",
            pair.source.short_name(),
            pair.target.short_name()
        ))
    }

    /// The category this name was scoped under
    #[must_use]
    pub fn scope(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Get the underlying string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MapperName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A finished, immutable mapper graph
///
/// Cheap to clone and safe to share across threads; `convert` takes no locks.
#[derive(Debug, Clone)]
pub struct CompiledMapper {
    root:     Address,
    mappers:  MapperTable,
    registry: Arc<ShapeRegistry>,
}

impl CompiledMapper {
    pub(crate) const fn new(
        root: Address,
        mappers: MapperTable,
        registry: Arc<ShapeRegistry>,
    ) -> Self {
        Self {
            root,
            mappers,
            registry,
        }
    }

    /// Address of the root mapper in [`Self::mappers`]
    #[must_use]
    pub const fn root(&self) -> Address {
        self.root
    }

    /// The root mapper
    #[must_use]
    pub fn root_mapper(&self) -> &Arc<dyn Mapper> {
        &self.mappers[self.root]
    }

    /// The conversion performed by the root mapper
    #[must_use]
    pub fn type_pair(&self) -> &TypePair {
        self.root_mapper().type_pair()
    }

    /// Every mapper of this graph, indexed by address
    #[must_use]
    pub const fn mappers(&self) -> &MapperTable {
        &self.mappers
    }

    /// Convert `source` after checking that it conforms to the source shape
    ///
    /// # Errors
    ///
    /// Fails with `ShapeMismatch` when `source` does not conform to the source shape.
    pub fn convert(&self, source: &Value) -> Result<Value> {
        self.registry.check(&self.type_pair().source, source)?;
        Ok(self.root_mapper().map(source, &self.mappers))
    }

    /// Decode `json` as the source shape, convert it and encode the result
    ///
    /// # Errors
    ///
    /// Fails with `ShapeMismatch` when `json` does not decode as the source shape, and with
    /// `Serialization` if the result cannot be encoded.
    pub fn convert_json(&self, json: &serde_json::Value) -> Result<serde_json::Value> {
        let source = self.registry.decode(&self.type_pair().source, json)?;
        let target = self.root_mapper().map(&source, &self.mappers);
        target.to_json()
    }
}
