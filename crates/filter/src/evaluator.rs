//! Filter evaluation against one node of a [`geofes_core::NodeGraph`].
//!
//! Comparison and temporal operators fail closed on missing data: an operand
//! that yields no value, or (with [`MatchAction::One`]) more than one value,
//! makes the operator false rather than an error. Bridge failures follow the
//! context's [`ValueErrorPolicy`]. Unsupported operators always surface as
//! errors.

use core::cmp::Ordering;
use core::mem;
use core::num::NonZeroUsize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use geofes_core::{
    ElementContent, GeometryParts, NodeId, NodeRef, PropertyValue, TimePosition, TimePrimitive, TypedNode, TypedValue,
    ValueError,
};
use lru::LruCache;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::bridge::{self, Comparable};
use crate::context::{EvalContext, ValueErrorPolicy};
use crate::error::EvalError;
use crate::extract::{Match, Matches, PropertyExtractor};
use crate::like::{LikePattern, LikeSyntax};
use crate::model::{
    Between, BinaryComparison, BinaryOp, ComparisonKind, ComparisonOperator, Expression, Filter, FilterOperator,
    Like, LogicalOperator, MatchAction, TemporalOperator,
};
use crate::temporal::{self, TimeAnchor};

/// Evaluate `op` against `target` with a default [`EvalContext`].
pub fn evaluate(
    op: &FilterOperator,
    target: NodeRef<'_>,
    extractor: &dyn PropertyExtractor,
) -> Result<bool, EvalError> {
    let ctx = EvalContext::default();
    Evaluator::new(&ctx, extractor).evaluate(op, target)
}

/// Operand value after descending from a matched node.
#[derive(Debug, Clone)]
enum Leaf {
    Value(TypedValue),
    Time(TimePrimitive),
}

impl Leaf {
    fn to_value(&self) -> Option<TypedValue> {
        match self {
            Leaf::Value(v) => Some(v.clone()),
            Leaf::Time(TimePrimitive::Instant(TimePosition::At { value, tz })) => {
                Some(TypedValue::DateTime { value: *value, tz: *tz })
            }
            Leaf::Time(_) => None,
        }
    }

    fn to_time(&self) -> Option<TimePrimitive> {
        match self {
            Leaf::Time(t) => Some(t.clone()),
            Leaf::Value(TypedValue::Text(raw)) => TimePosition::parse(raw).ok().map(TimePrimitive::Instant),
            Leaf::Value(v) => TimePosition::from_value(v).map(TimePrimitive::Instant),
        }
    }
}

type Leaves = SmallVec<[Leaf; 1]>;

type LikeKey = (String, LikeSyntax);

/// Evaluates filters with one configuration and one extractor.
///
/// Holds a small cache of compiled like patterns, so an evaluator is meant to
/// be reused across the features of one query but not shared between threads.
pub struct Evaluator<'a> {
    ctx: &'a EvalContext,
    extractor: &'a dyn PropertyExtractor,
    anchor: TimeAnchor,
    like_cache: Option<RefCell<LruCache<LikeKey, Rc<LikePattern>>>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a EvalContext, extractor: &'a dyn PropertyExtractor) -> Self {
        let like_cache = NonZeroUsize::new(ctx.like_cache_capacity).map(|cap| RefCell::new(LruCache::new(cap)));
        Self { ctx, extractor, anchor: ctx.time_anchor(), like_cache }
    }

    pub fn evaluate_filter(&self, filter: &Filter, target: NodeRef<'_>) -> Result<bool, EvalError> {
        match filter {
            Filter::Operator(op) => self.evaluate(op, target),
            Filter::ResourceId(ids) => {
                let id = target.resolve().and_then(NodeRef::gml_id);
                Ok(id.is_some_and(|id| ids.iter().any(|candidate| candidate.as_str() == id)))
            }
        }
    }

    pub fn evaluate(&self, op: &FilterOperator, target: NodeRef<'_>) -> Result<bool, EvalError> {
        match op {
            FilterOperator::Comparison(c) => self.comparison(c, target),
            FilterOperator::Temporal(t) => self.temporal(t, target),
            FilterOperator::Logical(LogicalOperator::And(ops)) => {
                for op in ops {
                    if !self.evaluate(op, target)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterOperator::Logical(LogicalOperator::Or(ops)) => {
                for op in ops {
                    if self.evaluate(op, target)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FilterOperator::Logical(LogicalOperator::Not(op)) => Ok(!self.evaluate(op, target)?),
        }
    }

    fn comparison(&self, op: &ComparisonOperator, target: NodeRef<'_>) -> Result<bool, EvalError> {
        match op {
            ComparisonOperator::Binary(b) => self.binary(b, target),
            ComparisonOperator::Between(b) => self.between(b, target),
            ComparisonOperator::Like(l) => self.like(l, target),
            ComparisonOperator::Null(Expression::TimeLiteral(_)) => Ok(false),
            ComparisonOperator::Null(expr) => {
                let matches = self.matches(expr, target);
                Ok(match matches.as_slice() {
                    [] | [Match::Value(TypedValue::Null)] => true,
                    _ => false,
                })
            }
            ComparisonOperator::Nil { expression, nil_reason } => {
                let matches = self.matches(expression, target);
                Ok(matches.iter().any(|m| match m {
                    Match::Nil { reason } => nil_reason.is_none() || reason == nil_reason,
                    _ => false,
                }))
            }
        }
    }

    fn binary(&self, b: &BinaryComparison, target: NodeRef<'_>) -> Result<bool, EvalError> {
        let left = self.leaves(&b.left, target);
        let right = self.leaves(&b.right, target);
        let test = |l: &Leaf, r: &Leaf| -> Result<bool, EvalError> {
            let ord = self.ordering(b.op.kind(), l, r, b.match_case)?;
            Ok(ord.is_some_and(|o| b.op.holds(o)))
        };
        match b.match_action {
            MatchAction::One => {
                let (Some(l), Some(r)) = (single(&left, &b.left), single(&right, &b.right)) else {
                    return Ok(false);
                };
                test(l, r)
            }
            // a failed pairing only surfaces when no other pairing decides the result
            MatchAction::Any => {
                let mut failed = None;
                for l in &left {
                    for r in &right {
                        match test(l, r) {
                            Ok(true) => return Ok(true),
                            Ok(false) => {}
                            Err(e) => {
                                failed.get_or_insert(e);
                            }
                        }
                    }
                }
                failed.map_or(Ok(false), Err)
            }
            MatchAction::All => {
                if left.is_empty() || right.is_empty() {
                    return Ok(false);
                }
                let mut failed = None;
                for l in &left {
                    for r in &right {
                        match test(l, r) {
                            Ok(true) => {}
                            Ok(false) => return Ok(false),
                            Err(e) => {
                                failed.get_or_insert(e);
                            }
                        }
                    }
                }
                failed.map_or(Ok(true), Err)
            }
        }
    }

    /// `lower <= value <= upper`. Both bounds must bridge the value into the
    /// same comparable family.
    fn between(&self, b: &Between, target: NodeRef<'_>) -> Result<bool, EvalError> {
        let value = self.leaves(&b.expression, target);
        let lower = self.leaves(&b.lower, target);
        let upper = self.leaves(&b.upper, target);
        let (Some(v), Some(lo), Some(hi)) =
            (single(&value, &b.expression), single(&lower, &b.lower), single(&upper, &b.upper))
        else {
            return Ok(false);
        };
        let (Some(v), Some(lo), Some(hi)) = (v.to_value(), lo.to_value(), hi.to_value()) else {
            trace!("between operand is not a comparable value");
            return Ok(false);
        };
        let kind = ComparisonKind::Between;
        let above = self.bridged(kind, &v, &lo, true)?;
        let below = self.bridged(kind, &v, &hi, true)?;
        let (Some((value_lo, lower)), Some((value_hi, upper))) = (above, below) else {
            return Ok(false);
        };
        if mem::discriminant(&value_lo) != mem::discriminant(&value_hi) {
            let e = ValueError::Incompatible { left: lo.kind(), right: hi.kind() };
            self.value_error::<()>(e.into())?;
            return Ok(false);
        }
        let Some(above) = self.ordered(&v, &lo, &value_lo, &lower)? else {
            return Ok(false);
        };
        let Some(below) = self.ordered(&v, &hi, &value_hi, &upper)? else {
            return Ok(false);
        };
        Ok(BinaryOp::GreaterThanOrEqualTo.holds(above) && BinaryOp::LessThanOrEqualTo.holds(below))
    }

    fn like(&self, l: &Like, target: NodeRef<'_>) -> Result<bool, EvalError> {
        let Expression::Literal(TypedValue::Text(pattern)) = &l.pattern else {
            return Err(EvalError::Unsupported(ComparisonKind::Like));
        };
        let syntax = LikeSyntax {
            wild_card: l.wild_card,
            single_char: l.single_char,
            escape_char: l.escape_char,
            match_case: l.match_case,
        };
        let compiled = self.like_pattern(pattern, syntax)?;

        let value = self.leaves(&l.expression, target);
        let Some(leaf) = single(&value, &l.expression) else {
            return Ok(false);
        };
        match leaf.to_value() {
            None | Some(TypedValue::Null) => Ok(false),
            Some(TypedValue::Text(s) | TypedValue::Code { value: s, .. }) => compiled.is_match(&s),
            Some(other) => compiled.is_match(&other.lexical()),
        }
    }

    fn like_pattern(&self, pattern: &str, syntax: LikeSyntax) -> Result<Rc<LikePattern>, EvalError> {
        let Some(cache) = &self.like_cache else {
            return LikePattern::compile(pattern, &syntax).map(Rc::new);
        };
        let key = (pattern.to_string(), syntax);
        if let Some(hit) = cache.borrow_mut().get(&key) {
            return Ok(Rc::clone(hit));
        }
        let compiled = Rc::new(LikePattern::compile(pattern, &syntax)?);
        trace!(pattern, "compiled like pattern");
        cache.borrow_mut().put(key, Rc::clone(&compiled));
        Ok(compiled)
    }

    fn temporal(&self, t: &TemporalOperator, target: NodeRef<'_>) -> Result<bool, EvalError> {
        // checked first so an unimplemented relation never hides behind missing data
        if !t.kind.is_implemented() {
            return Err(EvalError::TemporalNotImplemented(t.kind));
        }
        let left = self.leaves(&t.left, target);
        let right = self.leaves(&t.right, target);
        let (Some(l), Some(r)) = (single(&left, &t.left), single(&right, &t.right)) else {
            return Ok(false);
        };
        let (Some(t1), Some(t2)) = (l.to_time(), r.to_time()) else {
            debug!(operator = %t.kind, "temporal operand is not a time value");
            return Ok(false);
        };
        Ok(temporal::evaluate(t.kind, &t1, &t2, &self.anchor)?)
    }

    /// Ordering of two leaves for `kind`, or `None` when the comparison fails closed.
    fn ordering(
        &self,
        kind: ComparisonKind,
        l: &Leaf,
        r: &Leaf,
        match_case: bool,
    ) -> Result<Option<Ordering>, EvalError> {
        let (Some(a), Some(b)) = (l.to_value(), r.to_value()) else {
            trace!(%kind, "operand is not a comparable value");
            return Ok(None);
        };
        let Some((ca, cb)) = self.bridged(kind, &a, &b, match_case)? else {
            return Ok(None);
        };
        self.ordered(&a, &b, &ca, &cb)
    }

    /// Bridge two values for `kind`. Null operands and failures under
    /// [`ValueErrorPolicy::FailClosed`] give `None`.
    fn bridged(
        &self,
        kind: ComparisonKind,
        a: &TypedValue,
        b: &TypedValue,
        match_case: bool,
    ) -> Result<Option<(Comparable, Comparable)>, EvalError> {
        if a.is_null() || b.is_null() {
            return Ok(None);
        }
        // the non-text operand fixes the family, so an unordered one is known before coercion
        if kind.is_ordering() && (unordered(a) || unordered(b)) {
            return Err(EvalError::Unsupported(kind));
        }
        let opts = self.ctx.compare_options(match_case);
        match bridge::make_comparable(a, b, &opts) {
            Ok(pair) => Ok(Some(pair)),
            Err(e) => self.value_error(e.into()),
        }
    }

    fn ordered(
        &self,
        a: &TypedValue,
        b: &TypedValue,
        ca: &Comparable,
        cb: &Comparable,
    ) -> Result<Option<Ordering>, EvalError> {
        match ca.partial_cmp(cb) {
            Some(ord) => Ok(Some(ord)),
            None => self.value_error(ValueError::Incompatible { left: a.kind(), right: b.kind() }.into()),
        }
    }

    fn value_error<T>(&self, e: EvalError) -> Result<Option<T>, EvalError> {
        match self.ctx.value_errors {
            ValueErrorPolicy::Propagate => Err(e),
            ValueErrorPolicy::FailClosed => {
                debug!(error = %e, "comparison failed closed");
                Ok(None)
            }
        }
    }

    /// Raw matches of an expression.
    fn matches<'g>(&self, expr: &Expression, target: NodeRef<'g>) -> Matches<'g> {
        match expr {
            Expression::PropertyName(path) => {
                let matches = self.extractor.extract(target, path);
                for m in &matches {
                    if let Match::Node(node) = m {
                        assert!(
                            core::ptr::eq(node.graph(), target.graph()),
                            "extractor returned node {} from a different graph for path {path}",
                            node.id()
                        );
                    }
                }
                if matches.is_empty() {
                    trace!(%path, "property absent");
                }
                matches
            }
            Expression::Literal(v) => smallvec::smallvec![Match::Value(v.clone())],
            Expression::TimeLiteral(_) => Matches::new(),
        }
    }

    /// Leaf values of an expression. Node matches are descended into; matches
    /// without a leaf are dropped.
    fn leaves(&self, expr: &Expression, target: NodeRef<'_>) -> Leaves {
        if let Expression::TimeLiteral(t) = expr {
            return smallvec::smallvec![Leaf::Time(t.clone())];
        }
        self.matches(expr, target)
            .into_iter()
            .filter_map(|m| match m {
                Match::Value(v) => Some(Leaf::Value(v)),
                Match::Nil { .. } => None,
                Match::Node(node) => descend(node),
            })
            .collect()
    }
}

fn unordered(v: &TypedValue) -> bool {
    matches!(v, TypedValue::Boolean(_) | TypedValue::Code { .. })
}

fn single<'l>(leaves: &'l Leaves, expr: &Expression) -> Option<&'l Leaf> {
    match leaves.as_slice() {
        [leaf] => Some(leaf),
        other => {
            trace!(%expr, count = other.len(), "operand does not yield exactly one value");
            None
        }
    }
}

/// Follow first children until a value or a time primitive is found.
fn descend(start: NodeRef<'_>) -> Option<Leaf> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut current = start;
    loop {
        if !visited.insert(current.id()) {
            trace!(node = %current.id(), "cycle while descending to a leaf");
            return None;
        }
        let next = match current.node() {
            TypedNode::Time(t) => return Some(Leaf::Time(t.primitive.clone())),
            TypedNode::Feature(f) => match &f.properties.first()?.value {
                PropertyValue::Value(v) => return Some(Leaf::Value(v.clone())),
                PropertyValue::Nil { .. } => return None,
                PropertyValue::Node(id) => *id,
            },
            TypedNode::Element(e) => match e.children.first()? {
                ElementContent::Text(v) => return Some(Leaf::Value(v.clone())),
                ElementContent::Node(id) => *id,
            },
            TypedNode::FeatureCollection(c) => *c.members.first()?,
            TypedNode::Reference(r) => r.target?,
            TypedNode::Geometry(g) => match &g.parts {
                GeometryParts::Leaf => return None,
                parts => parts.node_ids().next()?,
            },
        };
        current = current.at(next);
    }
}
