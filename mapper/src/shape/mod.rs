//! Shape descriptors
//!
//! A shape is the runtime description of a type that values can take. Shapes are identified by
//! name: structural names such as `Vec<i64>` or `[f64]` describe themselves, everything else must
//! be declared in a [`ShapeRegistry`].

mod registry;
mod type_parser;

pub use registry::ShapeRegistry;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
pub use type_parser::{ShapeExpr, parse_shape_name, simplify_shape_name};

use crate::constants::{SHAPE_BOOL, SHAPE_F32, SHAPE_F64, SHAPE_I32, SHAPE_I64, SHAPE_STRING};

/// A newtype wrapper for shape names used as `HashMap` keys
///
/// Whitespace is not significant in shape names, so it is stripped on construction:
/// `Vec< i64 >` and `Vec<i64>` name the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ShapeName(String);

impl ShapeName {
    /// Create a canonical shape name
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(
            name.as_ref()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
        )
    }

    /// Get the underlying string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the short name with module paths removed at every nesting level
    ///
    /// For example: `std::vec::Vec<alloc::string::String>` returns `Vec<String>`
    #[must_use]
    pub fn short_name(&self) -> String {
        simplify_shape_name(&self.0)
    }
}

impl From<&str> for ShapeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ShapeName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&String> for ShapeName {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl From<Primitive> for ShapeName {
    fn from(primitive: Primitive) -> Self {
        Self(primitive.to_string())
    }
}

impl From<ShapeName> for String {
    fn from(name: ShapeName) -> Self {
        name.0
    }
}

impl std::fmt::Display for ShapeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar shapes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
pub enum Primitive {
    /// `bool`
    #[serde(rename = "bool")]
    #[strum(serialize = "bool")]
    Bool,
    /// `i32`
    #[serde(rename = "i32")]
    #[strum(serialize = "i32")]
    I32,
    /// `i64`
    #[serde(rename = "i64")]
    #[strum(serialize = "i64")]
    I64,
    /// `f32`
    #[serde(rename = "f32")]
    #[strum(serialize = "f32")]
    F32,
    /// `f64`
    #[serde(rename = "f64")]
    #[strum(serialize = "f64")]
    F64,
    /// `String`
    #[serde(rename = "String")]
    #[strum(serialize = "String")]
    String,
}

impl Primitive {
    /// Resolve a primitive from the last path segment of a shape name
    #[must_use]
    pub fn from_shape_name(name: &str) -> Option<Self> {
        match name.rsplit("::").next().unwrap_or(name) {
            SHAPE_BOOL => Some(Self::Bool),
            SHAPE_I32 => Some(Self::I32),
            SHAPE_I64 => Some(Self::I64),
            SHAPE_F32 => Some(Self::F32),
            SHAPE_F64 => Some(Self::F64),
            SHAPE_STRING => Some(Self::String),
            _ => None,
        }
    }

    /// Integer primitives
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32 | Self::I64)
    }

    /// Floating point primitives
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Structure of a shape
///
/// Serialized with a `kind` tag so shapes can be declared in configuration:
/// `{"kind": "List", "items": "Tree"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "kind", rename_all = "PascalCase")]
pub enum ShapeKind {
    /// Scalar value
    Value {
        /// The scalar type
        primitive: Primitive,
    },
    /// Array; its length is taken from the value it is built from
    Array {
        /// Element shape
        items: ShapeName,
    },
    /// Ordered, variable-length list
    List {
        /// Element shape
        items: ShapeName,
    },
    /// Iterable of unknown length
    Sequence {
        /// Element shape
        items: ShapeName,
    },
    /// Key/value map
    Map {
        /// Key shape
        key:   ShapeName,
        /// Value shape
        value: ShapeName,
    },
}

impl ShapeKind {
    /// Shapes that produce a sequence of elements when iterated
    #[must_use]
    pub const fn is_iterable(&self) -> bool {
        matches!(
            self,
            Self::Array { .. } | Self::List { .. } | Self::Sequence { .. }
        )
    }

    /// Declared element shape of arrays, lists and sequences
    #[must_use]
    pub const fn items(&self) -> Option<&ShapeName> {
        match self {
            Self::Array { items } | Self::List { items } | Self::Sequence { items } => Some(items),
            Self::Value { .. } | Self::Map { .. } => None,
        }
    }

    /// Every shape name this shape refers to
    #[must_use]
    pub fn referenced(&self) -> Vec<&ShapeName> {
        match self {
            Self::Value { .. } => vec![],
            Self::Array { items } | Self::List { items } | Self::Sequence { items } => vec![items],
            Self::Map { key, value } => vec![key, value],
        }
    }
}
