//! Runtime values
//!
//! Values are the instances that mappers convert. They serialize to natural JSON: containers
//! become arrays, maps become arrays of `[key, value]` pairs.

use error_stack::ResultExt;
use serde::Serialize;
use strum::AsRefStr;

use crate::error::{Error, Result};

/// An instance of some shape
#[derive(Debug, Clone, PartialEq, Serialize, AsRefStr)]
#[serde(untagged)]
pub enum Value {
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar (`i32` and `i64` shapes)
    Int(i64),
    /// Floating point scalar (`f32` and `f64` shapes)
    Float(f64),
    /// String scalar
    String(String),
    /// Array, sized once at construction
    Array(Box<[Self]>),
    /// Ordered, growable list
    List(Vec<Self>),
    /// Iterable of unknown length
    Sequence(Vec<Self>),
    /// Key/value entries in insertion order
    Map(Vec<(Self, Self)>),
}

impl Value {
    /// Build an array value
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Build a list value
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build a sequence value
    #[must_use]
    pub fn sequence(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// Iterate the elements of an array, list or sequence
    #[must_use]
    pub fn elements(&self) -> Option<std::slice::Iter<'_, Self>> {
        match self {
            Self::Array(items) => Some(items.iter()),
            Self::List(items) | Self::Sequence(items) => Some(items.iter()),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) | Self::Map(_) => None,
        }
    }

    /// Convert to JSON
    ///
    /// # Errors
    ///
    /// Fails with `Serialization` if `serde_json` rejects the value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .change_context(Error::Serialization(format!("{} value", self.as_ref())))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(int: i32) -> Self {
        Self::Int(i64::from(int))
    }
}

impl From<i64> for Value {
    fn from(int: i64) -> Self {
        Self::Int(int)
    }
}

impl From<f64> for Value {
    fn from(float: f64) -> Self {
        Self::Float(float)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
