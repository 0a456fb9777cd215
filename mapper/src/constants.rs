//! Shared constants: builder scopes, shape names and recursion limits

// ============================================================================
// BUILD CONSTANTS
// ============================================================================

/// Default maximum nesting depth for a single mapper build
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Scope under which collection mappers are named
pub const SCOPE_COLLECTION_MAPPERS: &str = "CollectionMappers";

/// Scope under which primitive mappers are named
pub const SCOPE_PRIMITIVE_MAPPERS: &str = "PrimitiveMappers";

// ============================================================================
// SHAPE NAME CONSTANTS
// ============================================================================

// Primitive shapes
/// Boolean primitive
pub const SHAPE_BOOL: &str = "bool";
/// 32-bit integer primitive
pub const SHAPE_I32: &str = "i32";
/// 64-bit integer primitive
pub const SHAPE_I64: &str = "i64";
/// 32-bit float primitive
pub const SHAPE_F32: &str = "f32";
/// 64-bit float primitive
pub const SHAPE_F64: &str = "f64";
/// Owned string primitive
pub const SHAPE_STRING: &str = "String";

// Structural constructors (base names, module paths are stripped before matching)
/// List-like constructors
pub const LIST_CONSTRUCTORS: &[&str] = &["Vec", "List", "VecDeque"];
/// Sequence (iterable, unknown length) constructors
pub const SEQUENCE_CONSTRUCTORS: &[&str] = &["Seq", "Iter", "IntoIter"];
/// Map constructors
pub const MAP_CONSTRUCTORS: &[&str] = &["HashMap", "BTreeMap"];

// ============================================================================
// RECURSION DEPTH
// ============================================================================

/// Nesting depth of the resolution currently in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecursionDepth(usize);

impl RecursionDepth {
    /// Depth of a top-level build
    pub const ZERO: Self = Self(0);

    /// One level deeper
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0 + 1)
    }

    /// One level shallower, saturating at zero
    #[must_use]
    pub const fn decrement(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Whether this depth has reached `limit`
    #[must_use]
    pub const fn exceeds(self, limit: usize) -> bool {
        self.0 >= limit
    }
}

impl std::fmt::Display for RecursionDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_increments_and_saturates() {
        let depth = RecursionDepth::ZERO.increment().increment();
        assert_eq!(depth.to_string(), "2");
        assert!(depth.exceeds(2));
        assert!(!depth.exceeds(3));
        assert_eq!(RecursionDepth::ZERO.decrement(), RecursionDepth::ZERO);
    }
}
