//! Parser for structural shape names with support for nested generics
//!
//! This module uses nom to parse shape names like:
//! - `i64`
//! - `Vec<String>`
//! - `[f64]`
//! - `Seq<Seq<i64>>`
//! - `std::collections::HashMap<String,Vec<u32>>`
//!
//! Only the outermost constructor is decoded here. Generic arguments are returned as their source
//! text so the registry can resolve them lazily, which keeps self-referential declarations cheap.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::char;
use nom::combinator::recognize;
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::{IResult, Parser};

use super::{Primitive, ShapeKind, ShapeName};
use crate::constants::{LIST_CONSTRUCTORS, MAP_CONSTRUCTORS, SEQUENCE_CONSTRUCTORS};

/// Outermost structure of a shape name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeExpr<'a> {
    /// A plain path such as `i64` or `my_crate::Tree`
    Named(&'a str),
    /// `[T]`
    Array(&'a str),
    /// `Base<A,B,..>`
    Generic {
        /// Constructor path, e.g. `std::vec::Vec`
        base: &'a str,
        /// Argument texts
        args: Vec<&'a str>,
    },
}

impl ShapeExpr<'_> {
    /// Structural kind of this expression, `None` for names that must be declared
    #[must_use]
    pub fn structural_kind(&self) -> Option<ShapeKind> {
        match self {
            Self::Named(name) => {
                Primitive::from_shape_name(name).map(|primitive| ShapeKind::Value { primitive })
            }
            Self::Array(items) => Some(ShapeKind::Array {
                items: ShapeName::from(*items),
            }),
            Self::Generic { base, args } => {
                let constructor = last_segment(base);
                match args.as_slice() {
                    [items] if LIST_CONSTRUCTORS.contains(&constructor) => Some(ShapeKind::List {
                        items: ShapeName::from(*items),
                    }),
                    [items] if SEQUENCE_CONSTRUCTORS.contains(&constructor) => {
                        Some(ShapeKind::Sequence {
                            items: ShapeName::from(*items),
                        })
                    }
                    [key, value] if MAP_CONSTRUCTORS.contains(&constructor) => {
                        Some(ShapeKind::Map {
                            key:   ShapeName::from(*key),
                            value: ShapeName::from(*value),
                        })
                    }
                    _ => None,
                }
            }
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Parse an identifier segment (alphanumeric + underscore)
fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

/// Parse a module path (`a::b::C`)
fn path(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(tag("::"), identifier)).parse(input)
}

/// Parse `[T]`
fn array(input: &str) -> IResult<&str, ShapeExpr<'_>> {
    delimited(char('['), shape_text, char(']'))
        .map(ShapeExpr::Array)
        .parse(input)
}

/// Parse `Base<A,B>`
fn generic(input: &str) -> IResult<&str, ShapeExpr<'_>> {
    (
        path,
        delimited(char('<'), separated_list1(char(','), shape_text), char('>')),
    )
        .map(|(base, args)| ShapeExpr::Generic { base, args })
        .parse(input)
}

fn shape_expr(input: &str) -> IResult<&str, ShapeExpr<'_>> {
    alt((array, generic, path.map(ShapeExpr::Named))).parse(input)
}

/// Recognize a complete nested shape and return its text
fn shape_text(input: &str) -> IResult<&str, &str> {
    recognize(shape_expr).parse(input)
}

/// Parse a canonical (whitespace-free) shape name
///
/// # Errors
///
/// Returns a parser diagnostic when `input` is not a complete shape name.
pub fn parse_shape_name(input: &str) -> Result<ShapeExpr<'_>, String> {
    match shape_expr(input) {
        Ok(("", expr)) => Ok(expr),
        Ok((remaining, _)) => Err(format!(
            "Unexpected characters after shape name: {remaining}"
        )),
        Err(e) => Err(format!("Failed to parse shape name: {e:?}")),
    }
}

/// Simplify a shape name by removing module paths but keeping generic structure
#[must_use]
pub fn simplify_shape_name(input: &str) -> String {
    match parse_shape_name(input) {
        Ok(ShapeExpr::Named(name)) => last_segment(name).to_string(),
        Ok(ShapeExpr::Array(items)) => format!("[{}]", simplify_shape_name(items)),
        Ok(ShapeExpr::Generic { base, args }) => {
            let args: Vec<String> = args.iter().map(|arg| simplify_shape_name(arg)).collect();
            format!("{}<{}>", last_segment(base), args.join(","))
        }
        Err(_) => input.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_name() {
        let expr = parse_shape_name("i64").unwrap();
        assert_eq!(expr, ShapeExpr::Named("i64"));
        assert_eq!(
            expr.structural_kind(),
            Some(ShapeKind::Value {
                primitive: Primitive::I64,
            })
        );
    }

    #[test]
    fn test_nested_generics_keep_argument_text() {
        let expr = parse_shape_name("Seq<Vec<i64>>").unwrap();
        assert_eq!(
            expr,
            ShapeExpr::Generic {
                base: "Seq",
                args: vec!["Vec<i64>"],
            }
        );
        assert_eq!(
            expr.structural_kind(),
            Some(ShapeKind::Sequence {
                items: ShapeName::from("Vec<i64>"),
            })
        );
    }

    #[test]
    fn test_array_of_lists() {
        let expr = parse_shape_name("[Vec<f64>]").unwrap();
        assert_eq!(expr, ShapeExpr::Array("Vec<f64>"));
    }

    #[test]
    fn test_module_paths_and_map_arguments() {
        let expr = parse_shape_name("std::collections::HashMap<String,Vec<u32>>").unwrap();
        assert_eq!(
            expr.structural_kind(),
            Some(ShapeKind::Map {
                key:   ShapeName::from("String"),
                value: ShapeName::from("Vec<u32>"),
            })
        );
    }

    #[test]
    fn test_declared_names_have_no_structural_kind() {
        assert_eq!(parse_shape_name("Tree").unwrap().structural_kind(), None);
        assert_eq!(
            parse_shape_name("Wrapper<i64>").unwrap().structural_kind(),
            None
        );
        assert_eq!(parse_shape_name("Vec<i64,i64>").unwrap().structural_kind(), None);
    }

    #[test]
    fn test_malformed_names_fail() {
        assert!(parse_shape_name("Vec<i64").is_err());
        assert!(parse_shape_name("[i64]]").is_err());
        assert!(parse_shape_name("").is_err());
    }

    #[test]
    fn test_simplify() {
        assert_eq!(
            simplify_shape_name("alloc::vec::Vec<alloc::string::String>"),
            "Vec<String>"
        );
        assert_eq!(simplify_shape_name("[my::Point]"), "[Point]");
    }
}
