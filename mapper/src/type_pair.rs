//! Conversion request key

use serde::{Deserialize, Serialize};

use crate::shape::ShapeName;

/// A requested conversion from one shape to another
///
/// Used purely as a dispatch and cache key; two pairs are equal when both shape names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypePair {
    /// Shape converted from
    pub source: ShapeName,
    /// Shape converted to
    pub target: ShapeName,
}

impl TypePair {
    /// Create a pair from anything that names a shape
    #[must_use]
    pub fn new(source: impl Into<ShapeName>, target: impl Into<ShapeName>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether both sides name the same shape
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}

impl std::fmt::Display for TypePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn pairs_compare_by_both_shapes() {
        let pair = TypePair::new("Vec<i64>", "Vec<String>");
        assert_eq!(pair, TypePair::new("Vec< i64 >", "Vec<String>"));
        assert_ne!(pair, TypePair::new("Vec<String>", "Vec<i64>"));

        let keys: HashSet<TypePair> = [pair.clone(), pair.clone()].into_iter().collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(pair.to_string(), "Vec<i64> -> Vec<String>");
        assert!(!pair.is_identity());
    }
}
