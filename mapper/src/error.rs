//! Error types for mapper building and conversion
//!
//! Every fallible operation returns [`Result`], an `error_stack::Report` over [`Error`], so callers
//! get the failing pair or shape plus any context added while the error propagated.

use thiserror::Error;

use crate::shape::ShapeName;
use crate::type_pair::TypePair;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";

/// Result type for the `shape_mapper` library
pub type Result<T> = std::result::Result<T, error_stack::Report<Error>>;

/// Build-time and boundary errors
///
/// Errors are raised while building a mapper graph or while validating input at the public
/// conversion boundary. A compiled mapper graph never fails once its input has been accepted.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or shape declarations could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal invariant breach
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A shape name could not be parsed
    #[error("Invalid shape name '{name}': {reason}")]
    InvalidShapeName {
        /// The offending name
        name:   String,
        /// Parser diagnostic
        reason: String,
    },

    /// No registered builder accepts the pair
    #[error("No mapper builder supports {pair}")]
    NoMapperBuilder {
        /// The pair that could not be dispatched
        pair: TypePair,
    },

    /// Building nested deeper than the configured limit
    #[error("Recursion limit of {limit} exceeded while building {pair}")]
    RecursionLimit {
        /// The pair being resolved when the limit was hit
        pair:  TypePair,
        /// The configured maximum depth
        limit: usize,
    },

    /// A value could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A value does not conform to the shape it was declared with
    #[error("Shape mismatch at '{path}': expected {expected}, found {found}")]
    ShapeMismatch {
        /// Location of the offending value, `$` is the root
        path:     String,
        /// The expected shape
        expected: ShapeName,
        /// Description of what was found instead
        found:    String,
    },

    /// A shape name is neither declared nor a known structural shape
    #[error("Unknown shape: {shape}")]
    UnknownShape {
        /// The unresolved shape
        shape: ShapeName,
    },

    /// A builder was asked to create a mapper for a pair it does not support
    #[error("Unsupported mapping: {pair} is not handled by {builder}")]
    UnsupportedMapping {
        /// The rejected pair
        pair:    TypePair,
        /// Scope name of the builder that rejected it
        builder: &'static str,
    },

    /// Element-shape extraction on a shape that has no element shape
    #[error("Unsupported shape: {shape} is not an array or list-like shape")]
    UnsupportedShape {
        /// The shape without an element type
        shape: ShapeName,
    },
}

impl Error {
    /// Create a "Failed to X" configuration error
    #[must_use]
    pub fn failed_to(action: &str, details: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" configuration error
    #[must_use]
    pub fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create a shape mismatch error
    #[must_use]
    pub fn mismatch(path: &str, expected: &ShapeName, found: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            path:     path.to_string(),
            expected: expected.clone(),
            found:    found.into(),
        }
    }
}
