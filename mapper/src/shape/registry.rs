//! Registry of declared shapes
//!
//! Structural names resolve on their own. Named shapes (aliases, self-referential shapes such as
//! `Tree = Vec<Tree>`) are declared up front and looked up by name.

use std::collections::HashMap;

use error_stack::{Report, ResultExt};
use tracing::debug;

use super::type_parser::parse_shape_name;
use super::{Primitive, ShapeKind, ShapeName};
use crate::error::{Error, Result};
use crate::value::Value;

/// Root marker used in shape mismatch paths
const ROOT_PATH: &str = "$";

/// Declared shapes plus structural resolution
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    declared: HashMap<ShapeName, ShapeKind>,
}

impl ShapeRegistry {
    /// Create a registry that only knows structural shapes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from declarations, validating that every referenced shape resolves
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` when a declaration is rejected by [`Self::declare`] or refers to
    /// a shape that does not resolve.
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = (ShapeName, ShapeKind)>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for (name, kind) in declarations {
            registry.declare(name, kind)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Declare a named shape
    ///
    /// Structural names (`Vec<T>`, `[T]`, primitives) describe themselves and cannot be
    /// redeclared.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidShapeName` when `name` does not parse, and with `Configuration` when it
    /// is structural or already declared.
    pub fn declare(&mut self, name: ShapeName, kind: ShapeKind) -> Result<()> {
        let expr = parse_shape_name(name.as_str()).map_err(|reason| {
            Report::new(Error::InvalidShapeName {
                name: name.to_string(),
                reason,
            })
        })?;
        if expr.structural_kind().is_some() {
            return Err(Report::new(Error::invalid(
                "shape declaration",
                format!("'{name}' is a structural shape and cannot be redeclared"),
            )));
        }
        if self.declared.contains_key(&name) {
            return Err(Report::new(Error::invalid(
                "shape declaration",
                format!("'{name}' is declared more than once"),
            )));
        }

        debug!(shape = %name, kind = kind.as_ref(), "Declared shape");
        self.declared.insert(name, kind);
        Ok(())
    }

    /// Check that every shape referenced by a declaration resolves
    ///
    /// # Errors
    ///
    /// Fails with `Configuration` naming the first declaration with an unresolvable reference.
    pub fn validate(&self) -> Result<()> {
        for (name, kind) in &self.declared {
            for referenced in kind.referenced() {
                self.kind_of(referenced).change_context_lazy(|| {
                    Error::invalid(
                        "shape declaration",
                        format!("'{name}' refers to unresolvable shape '{referenced}'"),
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Whether `name` was declared rather than parsed
    #[must_use]
    pub fn is_declared(&self, name: &ShapeName) -> bool {
        self.declared.contains_key(name)
    }

    /// Number of declared shapes
    #[must_use]
    pub fn declared_len(&self) -> usize {
        self.declared.len()
    }

    /// Resolve the structure of a shape
    ///
    /// # Errors
    ///
    /// Fails with `InvalidShapeName` for unparseable names and `UnknownShape` for names that are
    /// neither declared nor structural.
    pub fn kind_of(&self, name: &ShapeName) -> Result<ShapeKind> {
        if let Some(kind) = self.declared.get(name) {
            return Ok(kind.clone());
        }

        let expr = parse_shape_name(name.as_str()).map_err(|reason| {
            Report::new(Error::InvalidShapeName {
                name: name.to_string(),
                reason,
            })
        })?;
        expr.structural_kind().ok_or_else(|| {
            Report::new(Error::UnknownShape {
                shape: name.clone(),
            })
        })
    }

    /// Element shape of an array, list or sequence
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedShape` for scalars and maps, or when `name` does not resolve.
    pub fn element_type(&self, name: &ShapeName) -> Result<ShapeName> {
        let kind = self.kind_of(name)?;
        kind.items().cloned().ok_or_else(|| {
            Report::new(Error::UnsupportedShape {
                shape: name.clone(),
            })
        })
    }

    /// Check that `value` conforms to `name`
    ///
    /// Sequence shapes accept any iterable value; array and list shapes require their own
    /// container.
    ///
    /// # Errors
    ///
    /// Fails with `ShapeMismatch` carrying the path of the first offending value.
    pub fn check(&self, name: &ShapeName, value: &Value) -> Result<()> {
        let kind = self.kind_of(name)?;
        self.check_with_kind(ROOT_PATH, name, &kind, value)
    }

    fn check_with_kind(
        &self,
        path: &str,
        name: &ShapeName,
        kind: &ShapeKind,
        value: &Value,
    ) -> Result<()> {
        match kind {
            ShapeKind::Value { primitive } => {
                if primitive_accepts(*primitive, value) {
                    Ok(())
                } else {
                    Err(Report::new(Error::mismatch(path, name, value.as_ref())))
                }
            }
            ShapeKind::Array { items } | ShapeKind::List { items } | ShapeKind::Sequence { items } => {
                let Some(elements) = container_elements(kind, value) else {
                    return Err(Report::new(Error::mismatch(path, name, value.as_ref())));
                };
                let items_kind = self.kind_of(items)?;
                for (index, element) in elements.enumerate() {
                    self.check_with_kind(&format!("{path}[{index}]"), items, &items_kind, element)?;
                }
                Ok(())
            }
            ShapeKind::Map {
                key,
                value: value_shape,
            } => {
                let Value::Map(entries) = value else {
                    return Err(Report::new(Error::mismatch(path, name, value.as_ref())));
                };
                let key_kind = self.kind_of(key)?;
                let value_kind = self.kind_of(value_shape)?;
                for (index, (entry_key, entry_value)) in entries.iter().enumerate() {
                    self.check_with_kind(&format!("{path}{{{index}}}.key"), key, &key_kind, entry_key)?;
                    self.check_with_kind(
                        &format!("{path}{{{index}}}.value"),
                        value_shape,
                        &value_kind,
                        entry_value,
                    )?;
                }
                Ok(())
            }
        }
    }

    /// Decode JSON into a value of shape `name`
    ///
    /// Maps decode from a JSON object when their key shape is `String`, otherwise from an array of
    /// `[key, value]` pairs.
    ///
    /// # Errors
    ///
    /// Fails with `ShapeMismatch` carrying the path of the first JSON value that does not fit.
    pub fn decode(&self, name: &ShapeName, json: &serde_json::Value) -> Result<Value> {
        let kind = self.kind_of(name)?;
        self.decode_with_kind(ROOT_PATH, name, &kind, json)
    }

    fn decode_with_kind(
        &self,
        path: &str,
        name: &ShapeName,
        kind: &ShapeKind,
        json: &serde_json::Value,
    ) -> Result<Value> {
        let mismatch = || Report::new(Error::mismatch(path, name, json_kind(json)));

        match kind {
            ShapeKind::Value { primitive } => decode_primitive(*primitive, json).ok_or_else(mismatch),
            ShapeKind::Array { items } | ShapeKind::List { items } | ShapeKind::Sequence { items } => {
                let elements = json.as_array().ok_or_else(mismatch)?;
                let items_kind = self.kind_of(items)?;
                let decoded = elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| {
                        self.decode_with_kind(&format!("{path}[{index}]"), items, &items_kind, element)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(match kind {
                    ShapeKind::Array { .. } => Value::Array(decoded.into_boxed_slice()),
                    ShapeKind::Sequence { .. } => Value::Sequence(decoded),
                    _ => Value::List(decoded),
                })
            }
            ShapeKind::Map {
                key,
                value: value_shape,
            } => {
                let key_kind = self.kind_of(key)?;
                let value_kind = self.kind_of(value_shape)?;
                let entries = match json {
                    serde_json::Value::Object(object)
                        if key_kind
                            == (ShapeKind::Value {
                                primitive: Primitive::String,
                            }) =>
                    {
                        object
                            .iter()
                            .map(|(entry_key, entry_value)| {
                                let decoded = self.decode_with_kind(
                                    &format!("{path}.{entry_key}"),
                                    value_shape,
                                    &value_kind,
                                    entry_value,
                                )?;
                                Ok((Value::String(entry_key.clone()), decoded))
                            })
                            .collect::<Result<Vec<_>>>()?
                    }
                    serde_json::Value::Array(pairs) => pairs
                        .iter()
                        .enumerate()
                        .map(|(index, pair)| {
                            let entry_path = format!("{path}{{{index}}}");
                            let Some([entry_key, entry_value]) =
                                pair.as_array().map(Vec::as_slice)
                            else {
                                return Err(Report::new(Error::mismatch(
                                    &entry_path,
                                    name,
                                    json_kind(pair),
                                )));
                            };
                            Ok((
                                self.decode_with_kind(
                                    &format!("{entry_path}.key"),
                                    key,
                                    &key_kind,
                                    entry_key,
                                )?,
                                self.decode_with_kind(
                                    &format!("{entry_path}.value"),
                                    value_shape,
                                    &value_kind,
                                    entry_value,
                                )?,
                            ))
                        })
                        .collect::<Result<Vec<_>>>()?,
                    _ => return Err(mismatch()),
                };
                Ok(Value::Map(entries))
            }
        }
    }
}

/// Elements of `value` when it is a container acceptable for `kind`
fn container_elements<'v>(
    kind: &ShapeKind,
    value: &'v Value,
) -> Option<std::slice::Iter<'v, Value>> {
    match (kind, value) {
        (ShapeKind::Array { .. }, Value::Array(_))
        | (ShapeKind::List { .. }, Value::List(_))
        | (ShapeKind::Sequence { .. }, Value::Array(_) | Value::List(_) | Value::Sequence(_)) => {
            value.elements()
        }
        _ => None,
    }
}

fn primitive_accepts(primitive: Primitive, value: &Value) -> bool {
    match (primitive, value) {
        (Primitive::Bool, Value::Bool(_))
        | (Primitive::I64, Value::Int(_))
        | (Primitive::F64, Value::Float(_))
        | (Primitive::String, Value::String(_)) => true,
        (Primitive::I32, Value::Int(int)) => i32::try_from(*int).is_ok(),
        (Primitive::F32, Value::Float(float)) => fits_f32(*float),
        _ => false,
    }
}

fn decode_primitive(primitive: Primitive, json: &serde_json::Value) -> Option<Value> {
    match primitive {
        Primitive::Bool => json.as_bool().map(Value::Bool),
        Primitive::I32 => json
            .as_i64()
            .filter(|int| i32::try_from(*int).is_ok())
            .map(Value::Int),
        Primitive::I64 => json.as_i64().map(Value::Int),
        Primitive::F32 => json.as_f64().filter(|float| fits_f32(*float)).map(Value::Float),
        Primitive::F64 => json.as_f64().map(Value::Float),
        Primitive::String => json.as_str().map(|s| Value::String(s.to_string())),
    }
}

/// Finite values beyond `f32::MAX` would become infinities once narrowed
fn fits_f32(float: f64) -> bool {
    !float.is_finite() || float.abs() <= f64::from(f32::MAX)
}

const fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
