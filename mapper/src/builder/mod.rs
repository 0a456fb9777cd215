//! Mapper builders and builder dispatch
//!
//! Each kind of conversion gets its own [`MapperBuilder`]. [`BuilderDispatch`] picks the first
//! builder that supports a pair, and [`BuildContext`] threads the per-build cache through every
//! recursive resolution so a builder can ask for its children's mappers by pair.

mod build_context;
mod collection;
mod primitive;

use std::sync::Arc;

pub use build_context::BuildContext;
pub use collection::{CollectionMapper, CollectionMapperBuilder, CollectionTarget};
use error_stack::Report;
use itertools::Itertools;
pub use primitive::{Conversion, PrimitiveMapper, PrimitiveMapperBuilder};

use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::shape::ShapeRegistry;
use crate::type_pair::TypePair;

/// Trait for building mappers for one kind of conversion
///
/// This trait provides type-directed dispatch for mapper building: each conversion kind gets its
/// own implementation, and builders that need mappers for nested shapes resolve them through the
/// [`BuildContext`] rather than calling each other.
pub trait MapperBuilder: std::fmt::Debug + Send + Sync {
    /// Category under which this builder's mappers are named
    fn scope_name(&self) -> &'static str;

    /// Whether this builder can create a mapper for `pair`
    ///
    /// Pure predicate. Callers must check it before calling [`Self::create`].
    fn is_supported(&self, pair: &TypePair, registry: &ShapeRegistry) -> bool;

    /// Create the mapper for `pair`
    ///
    /// Nested pairs are resolved with [`BuildContext::resolve`], which may recurse into this or any
    /// other builder.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMapping` when `pair` is not supported, and propagates any failure to
    /// resolve a nested pair.
    fn create(&self, pair: &TypePair, ctx: &mut BuildContext<'_>) -> Result<Arc<dyn Mapper>>;
}

/// Ordered list of builders consulted for every pair
pub struct BuilderDispatch {
    builders: Vec<Box<dyn MapperBuilder>>,
}

impl Default for BuilderDispatch {
    fn default() -> Self {
        Self {
            builders: vec![
                Box::new(CollectionMapperBuilder),
                Box::new(PrimitiveMapperBuilder),
            ],
        }
    }
}

impl std::fmt::Debug for BuilderDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderDispatch")
            .field("builders", &self.scopes().join(", "))
            .finish()
    }
}

impl BuilderDispatch {
    /// Dispatch with no builders
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            builders: Vec::new(),
        }
    }

    /// Register a builder ahead of the existing ones
    ///
    /// Later registrations take precedence, so a custom builder can claim pairs the default
    /// builders would otherwise handle.
    pub fn register(&mut self, builder: impl MapperBuilder + 'static) {
        self.builders.insert(0, Box::new(builder));
    }

    /// Scope names of the registered builders in precedence order
    pub fn scopes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.iter().map(|builder| builder.scope_name())
    }

    /// First builder that supports `pair`
    ///
    /// Both shapes are resolved first so an unknown shape is reported as such rather than as a
    /// missing builder.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownShape` or `InvalidShapeName` when either shape does not resolve, and with
    /// `NoMapperBuilder` when no builder accepts the pair.
    pub fn builder_for(
        &self,
        pair: &TypePair,
        registry: &ShapeRegistry,
    ) -> Result<&dyn MapperBuilder> {
        registry.kind_of(&pair.source)?;
        registry.kind_of(&pair.target)?;

        self.builders
            .iter()
            .find(|builder| builder.is_supported(pair, registry))
            .map(|builder| &**builder)
            .ok_or_else(|| Report::new(Error::NoMapperBuilder { pair: pair.clone() }))
    }
}
