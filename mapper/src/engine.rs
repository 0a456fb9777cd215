//! Mapping engine
//!
//! Entry point for callers: owns the shape registry and builder dispatch, builds a mapper graph
//! per [`TypePair`] on first request and hands out the memoized graph afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use error_stack::Report;
use tracing::{debug, info};

use crate::builder::{BuildContext, BuilderDispatch};
use crate::config::MapperConfig;
use crate::error::{Error, Result};
use crate::mapper::CompiledMapper;
use crate::shape::ShapeRegistry;
use crate::type_pair::TypePair;
use crate::value::Value;

/// Builds, memoizes and runs mapper graphs
#[derive(Debug)]
pub struct MappingEngine {
    registry:  Arc<ShapeRegistry>,
    dispatch:  BuilderDispatch,
    max_depth: usize,
    mappers:   Mutex<HashMap<TypePair, CompiledMapper>>,
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self {
            registry:  Arc::new(ShapeRegistry::new()),
            dispatch:  BuilderDispatch::default(),
            max_depth: MapperConfig::default().max_recursion_depth,
            mappers:   Mutex::new(HashMap::new()),
        }
    }
}

impl MappingEngine {
    /// Create an engine with the default builders
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` when the configured shape declarations are rejected.
    pub fn new(config: &MapperConfig) -> Result<Self> {
        Self::with_dispatch(config, BuilderDispatch::default())
    }

    /// Create an engine with a custom builder dispatch
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` when the configured shape declarations are rejected.
    pub fn with_dispatch(config: &MapperConfig, dispatch: BuilderDispatch) -> Result<Self> {
        let registry = config.registry()?;
        debug!(
            shapes = registry.declared_len(),
            max_depth = config.max_recursion_depth,
            ?dispatch,
            "Created mapping engine"
        );
        Ok(Self {
            registry: Arc::new(registry),
            dispatch,
            max_depth: config.max_recursion_depth,
            mappers: Mutex::new(HashMap::new()),
        })
    }

    /// Shapes known to this engine
    #[must_use]
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// The mapper graph for `pair`, built on first request
    ///
    /// Concurrent first requests for the same pair may each build a graph; the first one stored
    /// wins and every caller receives it. Failed builds are not remembered.
    ///
    /// # Errors
    ///
    /// Fails with any build error from [`Self::build`], and with `InvalidState` if the memo lock
    /// was poisoned.
    pub fn mapper(&self, pair: &TypePair) -> Result<CompiledMapper> {
        let cached = self.memo()?.get(pair).cloned();
        if let Some(compiled) = cached {
            return Ok(compiled);
        }

        let compiled = self.build(pair)?;
        Ok(self
            .memo()?
            .entry(pair.clone())
            .or_insert(compiled)
            .clone())
    }

    /// Build a fresh mapper graph for `pair` without consulting the memo
    ///
    /// # Errors
    ///
    /// Fails with `UnknownShape`, `NoMapperBuilder` or `RecursionLimit` when some pair in the graph
    /// cannot be built.
    pub fn build(&self, pair: &TypePair) -> Result<CompiledMapper> {
        let mut ctx = BuildContext::new(Arc::clone(&self.registry), &self.dispatch, self.max_depth);
        let root = ctx.resolve(pair.clone())?;
        let compiled = ctx.finish(root)?;
        info!(
            %pair,
            mappers = compiled.mappers().len(),
            root = %compiled.root_mapper().name(),
            "Built mapper graph"
        );
        Ok(compiled)
    }

    /// Convert `value` from `pair.source` to `pair.target`
    ///
    /// # Errors
    ///
    /// Fails when the mapper cannot be built, or with `ShapeMismatch` when `value` does not
    /// conform to `pair.source`.
    pub fn convert(&self, pair: &TypePair, value: &Value) -> Result<Value> {
        self.mapper(pair)?.convert(value)
    }

    fn memo(&self) -> Result<MutexGuard<'_, HashMap<TypePair, CompiledMapper>>> {
        self.mappers.lock().map_err(|_| {
            Report::new(Error::InvalidState(
                "mapper memo lock poisoned".to_string(),
            ))
        })
    }
}
