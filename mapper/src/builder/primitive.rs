//! Builder for scalar conversions
//!
//! **Recursion**: NO - primitive mappers are the leaves of every mapper graph.
//!
//! Only total conversions are offered: widening between numeric types, booleans to numbers, and
//! any scalar to `String`. Narrowing and parsing are not supported.

use std::sync::Arc;

use error_stack::Report;
use strum::{AsRefStr, Display};
use tracing::warn;

use super::{BuildContext, MapperBuilder};
use crate::cache::MapperTable;
use crate::constants::SCOPE_PRIMITIVE_MAPPERS;
use crate::error::{Error, Result};
use crate::mapper::{Mapper, MapperName};
use crate::shape::{Primitive, ShapeKind, ShapeName, ShapeRegistry};
use crate::type_pair::TypePair;
use crate::value::Value;

/// Scalar conversion table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Conversion {
    /// Same representation on both sides
    Identity,
    /// `i32` -> `i64`
    WidenInteger,
    /// Integer -> float
    IntegerToFloat,
    /// `f32` <-> `f64`
    ResizeFloat,
    /// `bool` -> integer
    BoolToInteger,
    /// `bool` -> float
    BoolToFloat,
    /// Any scalar -> `String`
    ToText,
}

impl Conversion {
    /// Look up the conversion from `source` to `target`
    #[must_use]
    pub fn between(source: Primitive, target: Primitive) -> Option<Self> {
        match (source, target) {
            (source, target) if source == target => Some(Self::Identity),
            (Primitive::I32, Primitive::I64) => Some(Self::WidenInteger),
            (source, target) if source.is_integer() && target.is_float() => {
                Some(Self::IntegerToFloat)
            }
            (source, target) if source.is_float() && target.is_float() => Some(Self::ResizeFloat),
            (Primitive::Bool, target) if target.is_integer() => Some(Self::BoolToInteger),
            (Primitive::Bool, target) if target.is_float() => Some(Self::BoolToFloat),
            (_, Primitive::String) => Some(Self::ToText),
            _ => None,
        }
    }

    /// Apply this conversion to a value of the `source` primitive
    ///
    /// Values that do not match the conversion are returned unchanged with a warning; the public
    /// conversion entry points check values against their shape before they get here.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        reason = "f32 targets deliberately round to f32 precision"
    )]
    pub fn apply(self, source: Primitive, target: Primitive, value: &Value) -> Value {
        match (self, value) {
            (Self::Identity | Self::WidenInteger, Value::Int(_))
            | (Self::Identity, Value::Bool(_) | Value::Float(_) | Value::String(_))
            | (Self::ToText, Value::String(_)) => value.clone(),
            (Self::IntegerToFloat, Value::Int(int)) => Value::Float(if target == Primitive::F32 {
                f64::from(*int as f32)
            } else {
                *int as f64
            }),
            (Self::ResizeFloat, Value::Float(float)) => Value::Float(if target == Primitive::F32 {
                f64::from(*float as f32)
            } else {
                *float
            }),
            (Self::BoolToInteger, Value::Bool(b)) => Value::Int(i64::from(*b)),
            (Self::BoolToFloat, Value::Bool(b)) => Value::Float(f64::from(u8::from(*b))),
            (Self::ToText, Value::Bool(b)) => Value::String(b.to_string()),
            (Self::ToText, Value::Int(int)) => Value::String(int.to_string()),
            (Self::ToText, Value::Float(float)) => Value::String(if source == Primitive::F32 {
                (*float as f32).to_string()
            } else {
                float.to_string()
            }),
            (
                Self::Identity
                | Self::WidenInteger
                | Self::IntegerToFloat
                | Self::ResizeFloat
                | Self::BoolToInteger
                | Self::BoolToFloat
                | Self::ToText,
                _,
            ) => {
                warn!(
                    conversion = self.as_ref(),
                    %source,
                    %target,
                    found = value.as_ref(),
                    "Scalar conversion received a value of the wrong kind, passing it through"
                );
                value.clone()
            },
        }
    }
}

/// Converts one scalar
#[derive(Debug)]
pub struct PrimitiveMapper {
    name:       MapperName,
    pair:       TypePair,
    source:     Primitive,
    target:     Primitive,
    conversion: Conversion,
}

impl PrimitiveMapper {
    /// The table entry this mapper applies
    #[must_use]
    pub const fn conversion(&self) -> Conversion {
        self.conversion
    }
}

impl Mapper for PrimitiveMapper {
    fn name(&self) -> &MapperName {
        &self.name
    }

    fn type_pair(&self) -> &TypePair {
        &self.pair
    }

    fn map(&self, source: &Value, _mappers: &MapperTable) -> Value {
        self.conversion.apply(self.source, self.target, source)
    }
}

/// Builds [`PrimitiveMapper`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveMapperBuilder;

impl PrimitiveMapperBuilder {
    fn primitive(shape: &ShapeName, registry: &ShapeRegistry) -> Option<Primitive> {
        match registry.kind_of(shape).ok()? {
            ShapeKind::Value { primitive } => Some(primitive),
            _ => None,
        }
    }

    fn primitives(pair: &TypePair, registry: &ShapeRegistry) -> Option<(Primitive, Primitive)> {
        Some((
            Self::primitive(&pair.source, registry)?,
            Self::primitive(&pair.target, registry)?,
        ))
    }
}

impl MapperBuilder for PrimitiveMapperBuilder {
    fn scope_name(&self) -> &'static str {
        SCOPE_PRIMITIVE_MAPPERS
    }

    fn is_supported(&self, pair: &TypePair, registry: &ShapeRegistry) -> bool {
        Self::primitives(pair, registry)
            .is_some_and(|(source, target)| Conversion::between(source, target).is_some())
    }

    fn create(&self, pair: &TypePair, ctx: &mut BuildContext<'_>) -> Result<Arc<dyn Mapper>> {
        let unsupported = || {
            Report::new(Error::UnsupportedMapping {
                pair:    pair.clone(),
                builder: self.scope_name(),
            })
        };
        let (source, target) = Self::primitives(pair, ctx.registry()).ok_or_else(unsupported)?;
        let conversion = if pair.is_identity() {
            Conversion::Identity
        } else {
            Conversion::between(source, target).ok_or_else(unsupported)?
        };

        Ok(Arc::new(PrimitiveMapper {
            name: MapperName::generate(self.scope_name(), pair),
            pair: pair.clone(),
            source,
            target,
            conversion,
        }))
    }
}
