//! Filter expression model (OGC Filter Encoding 2.0 operators).

use core::cmp::Ordering;
use core::fmt;
use geofes_core::{GmlId, PropertyPath, TimePrimitive, TypedValue};
use itertools::Itertools;

use crate::temporal::TemporalKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    PropertyName(PropertyPath),
    Literal(TypedValue),
    TimeLiteral(TimePrimitive),
}

impl Expression {
    /// Unqualified single-step property reference.
    pub fn property(local: &str) -> Self {
        Expression::PropertyName(PropertyPath::name(local))
    }

    pub fn literal(v: impl Into<TypedValue>) -> Self {
        Expression::Literal(v.into())
    }
}

impl From<PropertyPath> for Expression {
    fn from(p: PropertyPath) -> Self {
        Expression::PropertyName(p)
    }
}

impl From<TimePrimitive> for Expression {
    fn from(t: TimePrimitive) -> Self {
        Expression::TimeLiteral(t)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::PropertyName(p) => write!(f, "{p}"),
            Expression::Literal(TypedValue::Text(s)) => write!(f, "'{s}'"),
            Expression::Literal(v) => write!(f, "{v}"),
            Expression::TimeLiteral(t) => write!(f, "{t}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonKind {
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
    Between,
    Like,
    Null,
    Nil,
}

impl ComparisonKind {
    /// Whether the operator needs an ordering rather than plain equality.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            ComparisonKind::LessThan
                | ComparisonKind::GreaterThan
                | ComparisonKind::LessThanOrEqualTo
                | ComparisonKind::GreaterThanOrEqualTo
                | ComparisonKind::Between
        )
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyIs{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
}

impl BinaryOp {
    pub fn kind(self) -> ComparisonKind {
        match self {
            BinaryOp::EqualTo => ComparisonKind::EqualTo,
            BinaryOp::NotEqualTo => ComparisonKind::NotEqualTo,
            BinaryOp::LessThan => ComparisonKind::LessThan,
            BinaryOp::GreaterThan => ComparisonKind::GreaterThan,
            BinaryOp::LessThanOrEqualTo => ComparisonKind::LessThanOrEqualTo,
            BinaryOp::GreaterThanOrEqualTo => ComparisonKind::GreaterThanOrEqualTo,
        }
    }

    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            BinaryOp::EqualTo => ord == Ordering::Equal,
            BinaryOp::NotEqualTo => ord != Ordering::Equal,
            BinaryOp::LessThan => ord == Ordering::Less,
            BinaryOp::GreaterThan => ord == Ordering::Greater,
            BinaryOp::LessThanOrEqualTo => ord != Ordering::Greater,
            BinaryOp::GreaterThanOrEqualTo => ord != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::EqualTo => "=",
            BinaryOp::NotEqualTo => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::GreaterThan => ">",
            BinaryOp::LessThanOrEqualTo => "<=",
            BinaryOp::GreaterThanOrEqualTo => ">=",
        }
    }
}

/// How multi-valued operands are matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchAction {
    /// Every operand must yield exactly one value.
    #[default]
    One,
    /// Some pairing of operand values satisfies the operator.
    Any,
    /// Every pairing satisfies the operator, and there is at least one.
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryComparison {
    pub op: BinaryOp,
    pub left: Expression,
    pub right: Expression,
    pub match_case: bool,
    pub match_action: MatchAction,
}

impl BinaryComparison {
    pub fn new(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self { op, left, right, match_case: true, match_action: MatchAction::default() }
    }

    #[must_use]
    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    #[must_use]
    pub fn match_action(mut self, action: MatchAction) -> Self {
        self.match_action = action;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Between {
    pub expression: Expression,
    pub lower: Expression,
    pub upper: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Like {
    pub expression: Expression,
    pub pattern: Expression,
    pub wild_card: char,
    pub single_char: char,
    pub escape_char: char,
    pub match_case: bool,
}

impl Like {
    pub fn new(expression: Expression, pattern: &str) -> Self {
        Self {
            expression,
            pattern: Expression::literal(pattern),
            wild_card: '*',
            single_char: '?',
            escape_char: '\\',
            match_case: true,
        }
    }

    #[must_use]
    pub fn meta(mut self, wild_card: char, single_char: char, escape_char: char) -> Self {
        self.wild_card = wild_card;
        self.single_char = single_char;
        self.escape_char = escape_char;
        self
    }

    #[must_use]
    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOperator {
    Binary(BinaryComparison),
    Between(Between),
    Like(Like),
    Null(Expression),
    Nil { expression: Expression, nil_reason: Option<String> },
}

impl ComparisonOperator {
    pub fn kind(&self) -> ComparisonKind {
        match self {
            ComparisonOperator::Binary(b) => b.op.kind(),
            ComparisonOperator::Between(_) => ComparisonKind::Between,
            ComparisonOperator::Like(_) => ComparisonKind::Like,
            ComparisonOperator::Null(_) => ComparisonKind::Null,
            ComparisonOperator::Nil { .. } => ComparisonKind::Nil,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalOperator {
    pub kind: TemporalKind,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    And(Vec<FilterOperator>),
    Or(Vec<FilterOperator>),
    Not(Box<FilterOperator>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperator {
    Comparison(ComparisonOperator),
    Temporal(TemporalOperator),
    Logical(LogicalOperator),
}

impl FilterOperator {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        BinaryComparison::new(op, left, right).into()
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::EqualTo, left, right)
    }

    pub fn not_equal(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::NotEqualTo, left, right)
    }

    pub fn less(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::LessThan, left, right)
    }

    pub fn greater(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::GreaterThan, left, right)
    }

    pub fn between(expression: Expression, lower: Expression, upper: Expression) -> Self {
        FilterOperator::Comparison(ComparisonOperator::Between(Between { expression, lower, upper }))
    }

    pub fn like(expression: Expression, pattern: &str) -> Self {
        Like::new(expression, pattern).into()
    }

    pub fn is_null(expression: Expression) -> Self {
        FilterOperator::Comparison(ComparisonOperator::Null(expression))
    }

    pub fn is_nil(expression: Expression, nil_reason: Option<&str>) -> Self {
        FilterOperator::Comparison(ComparisonOperator::Nil {
            expression,
            nil_reason: nil_reason.map(str::to_string),
        })
    }

    pub fn temporal(kind: TemporalKind, left: Expression, right: Expression) -> Self {
        FilterOperator::Temporal(TemporalOperator { kind, left, right })
    }

    pub fn and(ops: impl IntoIterator<Item = FilterOperator>) -> Self {
        FilterOperator::Logical(LogicalOperator::And(ops.into_iter().collect()))
    }

    pub fn or(ops: impl IntoIterator<Item = FilterOperator>) -> Self {
        FilterOperator::Logical(LogicalOperator::Or(ops.into_iter().collect()))
    }

    pub fn not(op: FilterOperator) -> Self {
        FilterOperator::Logical(LogicalOperator::Not(Box::new(op)))
    }
}

impl From<BinaryComparison> for FilterOperator {
    fn from(b: BinaryComparison) -> Self {
        FilterOperator::Comparison(ComparisonOperator::Binary(b))
    }
}

impl From<Like> for FilterOperator {
    fn from(l: Like) -> Self {
        FilterOperator::Comparison(ComparisonOperator::Like(l))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::Comparison(c) => match c {
                ComparisonOperator::Binary(b) => write!(f, "{} {} {}", b.left, b.op.symbol(), b.right),
                ComparisonOperator::Between(b) => {
                    write!(f, "{} BETWEEN {} AND {}", b.expression, b.lower, b.upper)
                }
                ComparisonOperator::Like(l) => write!(f, "{} LIKE {}", l.expression, l.pattern),
                ComparisonOperator::Null(e) => write!(f, "{e} IS NULL"),
                ComparisonOperator::Nil { expression, .. } => write!(f, "{expression} IS NIL"),
            },
            FilterOperator::Temporal(t) => write!(f, "{} {} {}", t.left, t.kind, t.right),
            FilterOperator::Logical(LogicalOperator::And(ops)) => write!(f, "({})", ops.iter().join(" AND ")),
            FilterOperator::Logical(LogicalOperator::Or(ops)) => write!(f, "({})", ops.iter().join(" OR ")),
            FilterOperator::Logical(LogicalOperator::Not(op)) => write!(f, "NOT {op}"),
        }
    }
}

/// Top-level filter: an operator tree or a set of resource ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Operator(FilterOperator),
    ResourceId(Vec<GmlId>),
}

impl From<FilterOperator> for Filter {
    fn from(op: FilterOperator) -> Self {
        Filter::Operator(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_like_a_predicate() {
        let op = FilterOperator::and([
            FilterOperator::equal(Expression::property("name"), Expression::literal("A1")),
            FilterOperator::not(FilterOperator::is_null(Expression::property("lanes"))),
        ]);
        assert_eq!(op.to_string(), "(name = 'A1' AND NOT lanes IS NULL)");
    }

    #[test]
    fn ordering_kinds() {
        assert!(ComparisonKind::Between.is_ordering());
        assert!(!ComparisonKind::EqualTo.is_ordering());
        assert_eq!(ComparisonKind::GreaterThan.to_string(), "PropertyIsGreaterThan");
    }
}
