//! Process-level support for the `shape-map` binary

mod tracing;

pub use self::tracing::{DynamicFilter, TracingLevel};
