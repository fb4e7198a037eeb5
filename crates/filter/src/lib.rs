//! OGC Filter Encoding evaluation over GML object graphs.
//!
//! ```
//! use geofes_core::{Feature, GraphBuilder, TypedValue};
//! use geofes_filter::{evaluate, Expression, FilterOperator, GraphExtractor};
//!
//! let mut builder = GraphBuilder::new();
//! let road = builder.add(Feature::new("Road").property("lanes", TypedValue::number(4)));
//! let graph = builder.build().unwrap();
//!
//! let filter = FilterOperator::greater(Expression::property("lanes"), Expression::literal("2"));
//! assert!(evaluate(&filter, graph.node_ref(road), &GraphExtractor).unwrap());
//! ```

pub mod bridge;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod like;
pub mod model;
pub mod temporal;

pub use bridge::{Comparable, CompareOptions, compare, make_comparable};
pub use context::{EvalContext, EvalContextBuilder, ValueErrorPolicy};
pub use error::EvalError;
pub use evaluator::{Evaluator, evaluate};
pub use extract::{GraphExtractor, Match, Matches, PropertyExtractor};
pub use like::{LikePattern, LikeSyntax};
pub use model::{
    Between, BinaryComparison, BinaryOp, ComparisonKind, ComparisonOperator, Expression, Filter, FilterOperator, Like,
    LogicalOperator, MatchAction, TemporalOperator,
};
pub use temporal::{NotImplemented, TemporalKind, TimeAnchor};
