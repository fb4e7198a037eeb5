//! Visitor-based traversal of GML object graphs that terminates on cycles.

pub mod traverse;
pub mod visitors;

pub use traverse::{Visitor, Walker, traverse, traverse_roots};
pub use visitors::{DuplicateId, FeatureCollector, IdChecker};
