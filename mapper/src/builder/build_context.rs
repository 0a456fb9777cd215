//! Context threaded through one mapper build
//!
//! A `BuildContext` is created per top-level build request and owned by it: it holds the
//! [`MapperCache`] that deduplicates and addresses every sub-mapper, and is discarded once the
//! finished graph has been frozen into a [`CompiledMapper`].

use std::sync::Arc;

use error_stack::Report;
use tracing::{debug, trace};

use super::BuilderDispatch;
use crate::cache::{Address, MapperCache};
use crate::constants::RecursionDepth;
use crate::error::{Error, Result};
use crate::mapper::CompiledMapper;
use crate::shape::ShapeRegistry;
use crate::type_pair::TypePair;

/// Build state for one top-level request
#[derive(Debug)]
pub struct BuildContext<'a> {
    registry:  Arc<ShapeRegistry>,
    dispatch:  &'a BuilderDispatch,
    cache:     MapperCache,
    depth:     RecursionDepth,
    max_depth: usize,
}

impl<'a> BuildContext<'a> {
    /// Create a context with an empty cache
    #[must_use]
    pub fn new(
        registry: Arc<ShapeRegistry>,
        dispatch: &'a BuilderDispatch,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            dispatch,
            cache: MapperCache::new(),
            depth: RecursionDepth::ZERO,
            max_depth,
        }
    }

    /// Shapes available to this build
    #[must_use]
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Registrations made so far
    #[must_use]
    pub const fn cache(&self) -> &MapperCache {
        &self.cache
    }

    /// Nesting depth of the resolution in progress
    #[must_use]
    pub const fn depth(&self) -> RecursionDepth {
        self.depth
    }

    /// Resolve the mapper for `pair` and return its address
    ///
    /// A pair that is already registered, including one whose build is still in progress
    /// further up the stack, resolves to its existing address. Otherwise the pair is reserved
    /// before its builder runs, so a self-referential shape finds the reservation instead of
    /// recursing forever, and the slot is filled once the builder returns. Builder failures
    /// propagate unchanged; every reservation made since this call is discarded first.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownShape` or `NoMapperBuilder` when the pair cannot be dispatched, with
    /// `RecursionLimit` when nesting exceeds the configured depth, and with any error raised by
    /// the chosen builder.
    pub fn resolve(&mut self, pair: TypePair) -> Result<Address> {
        if let Some(address) = self.cache.address_of(&pair) {
            trace!(%pair, %address, "Reusing registered mapper");
            return Ok(address);
        }
        if self.depth.exceeds(self.max_depth) {
            return Err(Report::new(Error::RecursionLimit {
                pair,
                limit: self.max_depth,
            }));
        }

        let dispatch = self.dispatch;
        let builder = dispatch.builder_for(&pair, &self.registry)?;
        let checkpoint = self.cache.len();
        let address = self.cache.reserve(pair.clone());
        debug!(
            %pair,
            %address,
            depth = %self.depth,
            scope = builder.scope_name(),
            "Building mapper"
        );

        self.depth = self.depth.increment();
        let created = builder.create(&pair, self);
        self.depth = self.depth.decrement();

        match created {
            Ok(mapper) => Ok(self.cache.add(pair, mapper)),
            Err(report) => {
                debug!(%pair, %address, "Build failed, discarding its reservations");
                self.cache.truncate(checkpoint);
                Err(report)
            },
        }
    }

    /// Freeze the cache and return the graph rooted at `root`
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when nothing was registered, a placeholder was never filled, or
    /// `root` is not an address of this build.
    pub fn finish(self, root: Address) -> Result<CompiledMapper> {
        let mappers = self.cache.freeze()?;
        if mappers.is_empty() {
            return Err(Report::new(Error::InvalidState(
                "finished a build that registered no mappers".to_string(),
            )));
        }
        if mappers.get(root).is_none() {
            return Err(Report::new(Error::InvalidState(format!(
                "root address {root} is outside the {} registered mappers",
                mappers.len()
            ))));
        }
        Ok(CompiledMapper::new(root, mappers, self.registry))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::shape::{ShapeKind, ShapeName};

    fn context(dispatch: &BuilderDispatch, max_depth: usize) -> BuildContext<'_> {
        BuildContext::new(Arc::new(ShapeRegistry::new()), dispatch, max_depth)
    }

    #[test]
    fn resolving_a_pair_twice_returns_the_same_address() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 8);
        let pair = TypePair::new("Vec<i64>", "Vec<String>");

        let first = ctx.resolve(pair.clone()).unwrap();
        let registered = ctx.cache().len();
        let second = ctx.resolve(pair).unwrap();

        assert_eq!(first, second);
        assert_eq!(ctx.cache().len(), registered);
        assert_eq!(ctx.depth(), RecursionDepth::ZERO);
    }

    #[test]
    fn nested_pairs_are_registered_before_their_children() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 8);

        let root = ctx
            .resolve(TypePair::new("Seq<Seq<i64>>", "Vec<Vec<String>>"))
            .unwrap();
        let registered: Vec<TypePair> = ctx
            .cache()
            .entries()
            .map(|item| item.type_pair().clone())
            .collect();

        assert_eq!(root.index(), 0);
        assert_eq!(
            registered,
            [
                TypePair::new("Seq<Seq<i64>>", "Vec<Vec<String>>"),
                TypePair::new("Seq<i64>", "Vec<String>"),
                TypePair::new("i64", "String"),
            ]
        );
    }

    #[test]
    fn depth_limit_aborts_the_build() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 2);

        let report = ctx
            .resolve(TypePair::new("Vec<Vec<Vec<i64>>>", "Vec<Vec<Vec<i64>>>"))
            .unwrap_err();
        assert!(matches!(
            report.current_context(),
            Error::RecursionLimit { limit: 2, .. }
        ));
    }

    #[test]
    fn failed_resolution_leaves_no_placeholders_behind() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 2);
        let pair = TypePair::new("Vec<Vec<Vec<i64>>>", "Vec<Vec<Vec<i64>>>");

        for _ in 0..2 {
            let report = ctx.resolve(pair.clone()).unwrap_err();
            assert!(matches!(
                report.current_context(),
                Error::RecursionLimit { .. }
            ));
            assert!(ctx.cache().is_empty());
            assert_eq!(ctx.depth(), RecursionDepth::ZERO);
        }

        let root = ctx.resolve(TypePair::new("Vec<i64>", "[String]")).unwrap();
        assert_eq!(root.index(), 0);
        assert_eq!(ctx.finish(root).unwrap().mappers().len(), 2);
    }

    #[test]
    fn failed_element_resolution_keeps_earlier_registrations() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 8);
        let kept = ctx.resolve(TypePair::new("i64", "String")).unwrap();

        assert!(
            ctx.resolve(TypePair::new("Vec<String>", "Vec<i64>"))
                .is_err()
        );

        let registered: Vec<TypePair> = ctx
            .cache()
            .entries()
            .map(|item| item.type_pair().clone())
            .collect();
        assert_eq!(registered, [TypePair::new("i64", "String")]);
        assert_eq!(ctx.finish(kept).unwrap().mappers().len(), 1);
    }

    #[test]
    fn finishing_an_empty_build_fails() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 8);
        let root = ctx.resolve(TypePair::new("i64", "String")).unwrap();
        let empty = context(&dispatch, 8);
        let report = empty.finish(root).unwrap_err();
        assert!(matches!(report.current_context(), Error::InvalidState(_)));
    }

    #[test]
    fn self_referential_shapes_resolve_to_their_reservation() {
        let registry = ShapeRegistry::from_declarations([
            (
                ShapeName::from("Tree"),
                ShapeKind::List {
                    items: ShapeName::from("Tree"),
                },
            ),
            (
                ShapeName::from("Forest"),
                ShapeKind::Array {
                    items: ShapeName::from("Forest"),
                },
            ),
        ])
        .unwrap();
        let dispatch = BuilderDispatch::default();
        let mut ctx = BuildContext::new(Arc::new(registry), &dispatch, 4);

        let root = ctx.resolve(TypePair::new("Tree", "Forest")).unwrap();
        assert_eq!(ctx.cache().len(), 1);

        let compiled = ctx.finish(root).unwrap();
        assert_eq!(compiled.mappers().len(), 1);
    }

    #[test]
    fn finishing_with_a_foreign_root_fails() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = context(&dispatch, 8);
        let root = ctx.resolve(TypePair::new("i64", "String")).unwrap();
        assert_eq!(root.index(), 0);

        let mut other = context(&dispatch, 8);
        other.resolve(TypePair::new("i64", "f64")).unwrap();
        other.resolve(TypePair::new("bool", "String")).unwrap();
        let foreign = other.cache().entries().nth(1).unwrap().address();

        let report = ctx.finish(foreign).unwrap_err();
        assert!(matches!(report.current_context(), Error::InvalidState(_)));
    }
}
