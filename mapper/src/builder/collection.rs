//! Builder for collection conversions
//!
//! Handles any iterable source (array, list, sequence) converted into an array or a list.
//!
//! **Recursion**: YES - the element pair is resolved through the [`BuildContext`], which may land
//! back in this builder for nested collections (e.g. `Seq<Seq<i64>>` -> `Vec<Vec<String>>`).
//! The resulting mapper only stores the element mapper's address.

use std::sync::Arc;

use error_stack::Report;
use serde::Serialize;
use strum::{AsRefStr, Display};
use tracing::warn;

use super::{BuildContext, MapperBuilder};
use crate::cache::{Address, MapperTable};
use crate::constants::SCOPE_COLLECTION_MAPPERS;
use crate::error::{Error, Result};
use crate::mapper::{Mapper, MapperName};
use crate::shape::{ShapeKind, ShapeName, ShapeRegistry};
use crate::type_pair::TypePair;
use crate::value::Value;

/// Container a collection mapper materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
pub enum CollectionTarget {
    /// Growable list, appended to incrementally
    List,
    /// Array sized from the drained source
    Array,
}

impl CollectionTarget {
    /// Target mode of a shape, `None` for shapes that cannot be collection targets
    #[must_use]
    pub const fn of(kind: &ShapeKind) -> Option<Self> {
        match kind {
            ShapeKind::List { .. } => Some(Self::List),
            ShapeKind::Array { .. } => Some(Self::Array),
            ShapeKind::Value { .. } | ShapeKind::Sequence { .. } | ShapeKind::Map { .. } => None,
        }
    }

    /// Collect converted items into this container
    #[must_use]
    pub fn materialize(self, items: impl Iterator<Item = Value>) -> Value {
        match self {
            Self::List => enumerable_to_list(items),
            Self::Array => enumerable_to_array(items),
        }
    }
}

fn enumerable_to_list(items: impl Iterator<Item = Value>) -> Value {
    let mut list = Vec::with_capacity(items.size_hint().0);
    list.extend(items);
    Value::List(list)
}

fn enumerable_to_array(items: impl Iterator<Item = Value>) -> Value {
    // The length is only known once the source has been drained
    let drained: Vec<Value> = items.collect();
    Value::Array(drained.into_boxed_slice())
}

/// Converts every element of an iterable through the element mapper at `element`
#[derive(Debug)]
pub struct CollectionMapper {
    name:    MapperName,
    pair:    TypePair,
    target:  CollectionTarget,
    element: Address,
}

impl CollectionMapper {
    /// Container this mapper produces
    #[must_use]
    pub const fn target(&self) -> CollectionTarget {
        self.target
    }

    /// Address of the element mapper
    #[must_use]
    pub const fn element(&self) -> Address {
        self.element
    }

    fn convert_item(&self, item: &Value, mappers: &MapperTable) -> Value {
        mappers[self.element].map(item, mappers)
    }
}

impl Mapper for CollectionMapper {
    fn name(&self) -> &MapperName {
        &self.name
    }

    fn type_pair(&self) -> &TypePair {
        &self.pair
    }

    fn map(&self, source: &Value, mappers: &MapperTable) -> Value {
        let Some(items) = source.elements() else {
            warn!(
                mapper = %self.name,
                found = source.as_ref(),
                "Collection mapper received a non-collection value, producing an empty {}",
                self.target
            );
            return self.target.materialize(std::iter::empty());
        };
        self.target
            .materialize(items.map(|item| self.convert_item(item, mappers)))
    }
}

/// Builds [`CollectionMapper`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionMapperBuilder;

impl CollectionMapperBuilder {
    /// Element shape of an array or list-like shape
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedShape` for anything else; only reachable when the support check was
    /// bypassed.
    pub fn element_type(shape: &ShapeName, registry: &ShapeRegistry) -> Result<ShapeName> {
        registry.element_type(shape)
    }

    fn unsupported(pair: &TypePair) -> Report<Error> {
        Report::new(Error::UnsupportedMapping {
            pair:    pair.clone(),
            builder: SCOPE_COLLECTION_MAPPERS,
        })
    }
}

impl MapperBuilder for CollectionMapperBuilder {
    fn scope_name(&self) -> &'static str {
        SCOPE_COLLECTION_MAPPERS
    }

    fn is_supported(&self, pair: &TypePair, registry: &ShapeRegistry) -> bool {
        registry
            .kind_of(&pair.source)
            .is_ok_and(|kind| kind.is_iterable())
            && registry
                .kind_of(&pair.target)
                .is_ok_and(|kind| CollectionTarget::of(&kind).is_some())
    }

    fn create(&self, pair: &TypePair, ctx: &mut BuildContext<'_>) -> Result<Arc<dyn Mapper>> {
        if !self.is_supported(pair, ctx.registry()) {
            return Err(Self::unsupported(pair));
        }

        let target_kind = ctx.registry().kind_of(&pair.target)?;
        let target = CollectionTarget::of(&target_kind).ok_or_else(|| Self::unsupported(pair))?;

        let source_element = Self::element_type(&pair.source, ctx.registry())?;
        let target_element = Self::element_type(&pair.target, ctx.registry())?;
        let element = ctx.resolve(TypePair::new(source_element, target_element))?;

        Ok(Arc::new(CollectionMapper {
            name: MapperName::generate(self.scope_name(), pair),
            pair: pair.clone(),
            target,
            element,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::builder::BuilderDispatch;
    use crate::shape::Primitive;

    fn build(registry: ShapeRegistry, pair: &TypePair) -> crate::mapper::CompiledMapper {
        let dispatch = BuilderDispatch::default();
        let mut ctx = BuildContext::new(Arc::new(registry), &dispatch, 16);
        let root = ctx.resolve(pair.clone()).unwrap();
        ctx.finish(root).unwrap()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn classification_requires_iterable_source_and_container_target() {
        let registry = ShapeRegistry::new();
        let builder = CollectionMapperBuilder;
        let supported = [
            ("Seq<i64>", "Vec<String>"),
            ("[i64]", "[f64]"),
            ("Vec<i64>", "[i64]"),
            ("[bool]", "Vec<String>"),
        ];
        let unsupported = [
            ("i64", "Vec<i64>"),
            ("Vec<i64>", "Seq<i64>"),
            ("Vec<i64>", "i64"),
            ("HashMap<String,i64>", "Vec<i64>"),
            ("Vec<i64>", "HashMap<String,i64>"),
            ("Widget", "Vec<i64>"),
        ];

        for (source, target) in supported {
            assert!(
                builder.is_supported(&TypePair::new(source, target), &registry),
                "{source} -> {target} should be supported"
            );
        }
        for (source, target) in unsupported {
            assert!(
                !builder.is_supported(&TypePair::new(source, target), &registry),
                "{source} -> {target} should not be supported"
            );
        }
    }

    #[test]
    fn element_type_of_scalar_is_unsupported_shape() {
        let report =
            CollectionMapperBuilder::element_type(&ShapeName::from("i64"), &ShapeRegistry::new())
                .unwrap_err();
        assert!(matches!(
            report.current_context(),
            Error::UnsupportedShape { .. }
        ));
    }

    #[test]
    fn create_rejects_unsupported_pairs() {
        let dispatch = BuilderDispatch::default();
        let mut ctx = BuildContext::new(Arc::new(ShapeRegistry::new()), &dispatch, 16);
        let report = CollectionMapperBuilder
            .create(&TypePair::new("i64", "Vec<String>"), &mut ctx)
            .unwrap_err();
        assert!(matches!(
            report.current_context(),
            Error::UnsupportedMapping {
                builder: SCOPE_COLLECTION_MAPPERS,
                ..
            }
        ));
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn sequence_to_list_preserves_order() {
        let mapper = build(
            ShapeRegistry::new(),
            &TypePair::new("Seq<i64>", "Vec<String>"),
        );
        let converted = mapper
            .convert(&Value::Sequence(ints(&[1, 2, 3])))
            .unwrap();
        assert_eq!(converted, Value::list(["1", "2", "3"].map(Value::from)));
    }

    #[test]
    fn array_to_array_widens_elements() {
        let mapper = build(ShapeRegistry::new(), &TypePair::new("[i64]", "[f64]"));
        let converted = mapper
            .convert(&Value::array(ints(&[5, 10, 15])))
            .unwrap();
        assert_eq!(
            converted,
            Value::array([5.0, 10.0, 15.0].map(Value::from))
        );
    }

    #[test]
    fn empty_sources_produce_empty_containers() {
        let to_list = build(
            ShapeRegistry::new(),
            &TypePair::new("Seq<i64>", "Vec<String>"),
        );
        assert_eq!(
            to_list.convert(&Value::Sequence(vec![])).unwrap(),
            Value::List(vec![])
        );

        let to_array = build(ShapeRegistry::new(), &TypePair::new("Seq<i64>", "[String]"));
        assert_eq!(
            to_array.convert(&Value::Sequence(vec![])).unwrap(),
            Value::array([])
        );
    }

    #[test]
    fn sequence_to_array_drains_every_element() {
        let mapper = build(ShapeRegistry::new(), &TypePair::new("Seq<i64>", "[String]"));
        let converted = mapper
            .convert(&Value::Sequence(ints(&[3, 1, 4, 1, 5])))
            .unwrap();
        assert_eq!(
            converted,
            Value::array(["3", "1", "4", "1", "5"].map(Value::from))
        );
    }

    #[test]
    fn nested_sequences_register_each_pair_once() {
        let mapper = build(
            ShapeRegistry::new(),
            &TypePair::new("Seq<Seq<i64>>", "Vec<Vec<String>>"),
        );
        let source = Value::sequence([
            Value::Sequence(ints(&[1, 2])),
            Value::Sequence(ints(&[3])),
        ]);

        assert_eq!(
            mapper.convert(&source).unwrap(),
            Value::list([
                Value::list(["1", "2"].map(Value::from)),
                Value::list(["3"].map(Value::from)),
            ])
        );

        let inner = TypePair::new("i64", "String");
        let registrations = mapper
            .mappers()
            .iter()
            .filter(|(_, child)| child.type_pair() == &inner)
            .count();
        assert_eq!(registrations, 1);
        assert_eq!(mapper.mappers().len(), 3);
    }

    #[test]
    fn element_addresses_point_at_the_element_pair() {
        let mapper = build(
            ShapeRegistry::new(),
            &TypePair::new("Vec<[i32]>", "[Vec<i64>]"),
        );
        let addresses: Vec<usize> = mapper.mappers().iter().map(|(a, _)| a.index()).collect();
        assert_eq!(addresses, [0, 1, 2]);
        assert_eq!(
            mapper.mappers()[mapper.root()].type_pair(),
            &TypePair::new("Vec<[i32]>", "[Vec<i64>]")
        );
        assert_eq!(
            mapper.mappers().iter().nth(1).unwrap().1.type_pair(),
            &TypePair::new("[i32]", "Vec<i64>")
        );

        let source = Value::list([
            Value::array([Value::Int(1), Value::Int(2)]),
            Value::array([]),
            Value::array([Value::Int(-3)]),
        ]);
        assert_eq!(
            mapper.convert(&source).unwrap(),
            Value::array([
                Value::list(ints(&[1, 2])),
                Value::list([]),
                Value::list(ints(&[-3])),
            ])
        );
    }

    #[test]
    fn self_referential_lists_convert_recursively() {
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
        let mapper = build(registry, &TypePair::new("Tree", "Forest"));

        let tree = Value::list([Value::list([]), Value::list([Value::list([])])]);
        assert_eq!(
            mapper.convert(&tree).unwrap(),
            Value::array([Value::array([]), Value::array([Value::array([])])])
        );
    }

    #[test]
    fn declared_aliases_are_resolved_for_elements() {
        let registry = ShapeRegistry::from_declarations([(
            ShapeName::from("UserId"),
            ShapeKind::Value {
                primitive: Primitive::I32,
            },
        )])
        .unwrap();
        let mapper = build(registry, &TypePair::new("Vec<UserId>", "[String]"));
        assert_eq!(
            mapper.convert(&Value::list(ints(&[7, 8]))).unwrap(),
            Value::array(["7", "8"].map(Value::from))
        );
    }

    #[test]
    fn source_values_are_not_mutated() {
        let mapper = build(ShapeRegistry::new(), &TypePair::new("Vec<i64>", "Vec<i64>"));
        let source = Value::list(ints(&[4, 5]));
        let converted = mapper.convert(&source).unwrap();
        assert_eq!(source, Value::list(ints(&[4, 5])));
        assert_eq!(converted, source);
    }

    #[test]
    fn mismatched_input_is_rejected_at_the_boundary() {
        let mapper = build(ShapeRegistry::new(), &TypePair::new("[i64]", "[f64]"));
        let report = mapper.convert(&Value::list(ints(&[1]))).unwrap_err();
        assert!(matches!(
            report.current_context(),
            Error::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn non_collection_input_materializes_an_empty_target() {
        let mapper = build(ShapeRegistry::new(), &TypePair::new("Vec<i64>", "[i64]"));
        let root = mapper.root_mapper();
        assert_eq!(
            root.map(&Value::Int(1), mapper.mappers()),
            Value::array([])
        );
    }
}
