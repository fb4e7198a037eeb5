//! Allen interval relations over GML time primitives.
//!
//! Both operands are normalised to `(start, end)` spans; an instant is a span of
//! length zero. Indeterminate positions become open bounds: `before` extends to
//! negative infinity and `after` to positive infinity, `now` is taken from the
//! evaluation anchor. A span with an `unknown` bound takes part in no relation.
//!
//! The relation table is not exhaustive. Kinds without an entry fail with
//! [`NotImplemented`], which callers must treat as an evaluation failure.

use chrono::{DateTime, FixedOffset, Utc};
use core::fmt;
use geofes_core::{Indeterminate, TimePosition, TimePrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    After,
    Before,
    Begins,
    BegunBy,
    TContains,
    During,
    TEquals,
    TOverlaps,
    Meets,
    OverlappedBy,
    MetBy,
    Ends,
    EndedBy,
    AnyInteracts,
}

impl TemporalKind {
    pub const ALL: [TemporalKind; 14] = [
        TemporalKind::After,
        TemporalKind::Before,
        TemporalKind::Begins,
        TemporalKind::BegunBy,
        TemporalKind::TContains,
        TemporalKind::During,
        TemporalKind::TEquals,
        TemporalKind::TOverlaps,
        TemporalKind::Meets,
        TemporalKind::OverlappedBy,
        TemporalKind::MetBy,
        TemporalKind::Ends,
        TemporalKind::EndedBy,
        TemporalKind::AnyInteracts,
    ];

    pub fn is_implemented(self) -> bool {
        relation(self).is_some()
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("temporal operator {0} is not implemented")]
pub struct NotImplemented(pub TemporalKind);

/// Reference points for resolving positions that carry no absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchor {
    pub implicit_timezone: FixedOffset,
    pub now: DateTime<FixedOffset>,
}

/// Span bound. Variant order gives `NegInf < At(_) < PosInf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bound {
    NegInf,
    At(DateTime<Utc>),
    PosInf,
}

impl Bound {
    fn resolve(position: &TimePosition, anchor: &TimeAnchor) -> Option<Bound> {
        match position {
            TimePosition::At { .. } => {
                position.instant(anchor.implicit_timezone).map(|i| Bound::At(i.with_timezone(&Utc)))
            }
            TimePosition::Indeterminate(Indeterminate::Before) => Some(Bound::NegInf),
            TimePosition::Indeterminate(Indeterminate::After) => Some(Bound::PosInf),
            TimePosition::Indeterminate(Indeterminate::Now) => Some(Bound::At(anchor.now.with_timezone(&Utc))),
            TimePosition::Indeterminate(Indeterminate::Unknown) => None,
        }
    }

    /// Coincidence of two bounds. Open bounds never coincide.
    fn meets(self, other: Bound) -> bool {
        matches!(self, Bound::At(_)) && self == other
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: Bound,
    end: Bound,
}

impl Span {
    fn of(t: &TimePrimitive, anchor: &TimeAnchor) -> Option<Span> {
        let (start, end) = t.bounds();
        Some(Span { start: Bound::resolve(start, anchor)?, end: Bound::resolve(end, anchor)? })
    }
}

type Relation = fn(&Span, &Span) -> bool;

fn relation(kind: TemporalKind) -> Option<Relation> {
    let r: Relation = match kind {
        TemporalKind::After => |a, b| a.start > b.end,
        TemporalKind::Before => |a, b| a.end < b.start,
        TemporalKind::Begins => |a, b| a.start.meets(b.start) && a.end < b.end,
        TemporalKind::BegunBy => |a, b| a.start.meets(b.start) && a.end > b.end,
        TemporalKind::During => |a, b| a.start > b.start && a.end < b.end,
        TemporalKind::TContains => |a, b| a.start < b.start && a.end > b.end,
        TemporalKind::TOverlaps => |a, b| a.start < b.start && a.end > b.start && a.end < b.end,
        TemporalKind::OverlappedBy => |a, b| a.start > b.start && a.start < b.end && a.end > b.end,
        TemporalKind::Meets => |a, b| a.end.meets(b.start),
        TemporalKind::MetBy => |a, b| a.start.meets(b.end),
        TemporalKind::TEquals => |a, b| a.start.meets(b.start) && a.end.meets(b.end),
        TemporalKind::AnyInteracts => |a, b| a.end >= b.start && a.start <= b.end,
        TemporalKind::Ends | TemporalKind::EndedBy => return None,
    };
    Some(r)
}

/// Evaluate `t1 <kind> t2`.
pub fn evaluate(
    kind: TemporalKind,
    t1: &TimePrimitive,
    t2: &TimePrimitive,
    anchor: &TimeAnchor,
) -> Result<bool, NotImplemented> {
    let rel = relation(kind).ok_or(NotImplemented(kind))?;
    match (Span::of(t1, anchor), Span::of(t2, anchor)) {
        (Some(a), Some(b)) => Ok(rel(&a, &b)),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    fn anchor() -> TimeAnchor {
        TimeAnchor {
            implicit_timezone: Utc.fix(),
            now: DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").unwrap(),
        }
    }

    #[test]
    fn open_bounds_order_around_instants() {
        let now = Bound::At(Utc::now());
        assert!(Bound::NegInf < now);
        assert!(now < Bound::PosInf);
        assert!(!Bound::PosInf.meets(Bound::PosInf));
    }

    #[test]
    fn now_resolves_against_anchor() {
        let t1 = TimePrimitive::instant("now").unwrap();
        let t2 = TimePrimitive::instant("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(evaluate(TemporalKind::After, &t1, &t2, &anchor()), Ok(true));
    }

    #[test]
    fn table_covers_all_but_ends() {
        for kind in TemporalKind::ALL {
            let expected = !matches!(kind, TemporalKind::Ends | TemporalKind::EndedBy);
            assert_eq!(kind.is_implemented(), expected, "{kind}");
        }
    }
}
