//! Core data model shared by the geofes filter evaluator and graph walker:
//! typed leaf values, GML time primitives, property paths and the node graph
//! produced by the GML parser.

pub mod graph;
pub mod name;
pub mod path;
pub mod time;
pub mod value;

pub use graph::{
    ElementContent, Feature, FeatureCollection, GenericElement, Geometry, GeometryKind, GeometryParts, GmlId,
    GraphBuilder, GraphError, NodeGraph, NodeId, NodeRef, Property, PropertyValue, Reference, TimeObject, TypedNode,
};
pub use name::{GML_NS, NamespaceBindings, QName};
pub use path::{PathError, PropertyPath, Step};
pub use time::{Indeterminate, Period, TimeError, TimePosition, TimePrimitive};
pub use value::{TypedValue, ValueError, ValueKind};
