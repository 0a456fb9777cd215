//! # Shape Mapper
//!
//! Builds converters between value shapes at runtime.
//!
//! A converter is requested for a [`TypePair`], a source shape and a target shape named the way
//! Rust types are written (`Vec<i64>`, `[String]`, `Seq<Seq<i32>>`). Builders registered with a
//! [`BuilderDispatch`] each handle one kind of conversion; the collection builder converts any
//! iterable into a list or an array by resolving a mapper for the element pair, recursively.
//!
//! Every mapper built for one request is registered once in a per-build [`MapperCache`] and
//! addressed by its position, so nested and self-referential shapes share mappers instead of
//! rebuilding them. The finished graph is an immutable [`CompiledMapper`] that can be shared
//! across threads.
//!
//! ```
//! use shape_mapper::{MappingEngine, TypePair, Value};
//!
//! let engine = MappingEngine::default();
//! let converted = engine
//!     .convert(
//!         &TypePair::new("Seq<i64>", "Vec<String>"),
//!         &Value::sequence([Value::Int(1), Value::Int(2)]),
//!     )
//!     .unwrap();
//! assert_eq!(converted, Value::list([Value::from("1"), Value::from("2")]));
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod shape;
pub mod support;
pub mod type_pair;
pub mod value;

pub use builder::{
    BuildContext, BuilderDispatch, CollectionMapper, CollectionMapperBuilder, MapperBuilder,
    PrimitiveMapperBuilder,
};
pub use cache::{Address, MapperCache, MapperTable};
pub use config::MapperConfig;
pub use engine::MappingEngine;
pub use error::{Error, Result};
pub use mapper::{CompiledMapper, Mapper, MapperName};
pub use shape::{Primitive, ShapeKind, ShapeName, ShapeRegistry};
pub use type_pair::TypePair;
pub use value::Value;
