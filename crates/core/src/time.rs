//! GML time primitives: instants and periods whose positions may be indeterminate.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use core::fmt;

use crate::value::{DATE_FORMAT, DATE_TIME_FORMAT, TypedValue, split_timezone, write_timezone};

/// `gml:indeterminatePosition` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indeterminate {
    Before,
    After,
    Now,
    Unknown,
}

impl fmt::Display for Indeterminate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Indeterminate::Before => "before",
            Indeterminate::After => "after",
            Indeterminate::Now => "now",
            Indeterminate::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimePosition {
    /// Calendar position. Dates are positioned at midnight; a missing zone means
    /// the implicit timezone of the evaluation.
    At { value: NaiveDateTime, tz: Option<FixedOffset> },
    Indeterminate(Indeterminate),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("period begins at {begin} after it ends at {end}")]
    Inverted { begin: TimePosition, end: TimePosition },
    #[error("malformed time position '{0}'")]
    Malformed(String),
}

impl TimePosition {
    pub fn at(value: NaiveDateTime, tz: Option<FixedOffset>) -> Self {
        TimePosition::At { value, tz }
    }

    /// Parse an xsd:dateTime or xsd:date lexical form, or one of the
    /// indeterminate keywords.
    pub fn parse(raw: &str) -> Result<Self, TimeError> {
        let trimmed = raw.trim();
        match trimmed {
            "before" => return Ok(TimePosition::Indeterminate(Indeterminate::Before)),
            "after" => return Ok(TimePosition::Indeterminate(Indeterminate::After)),
            "now" => return Ok(TimePosition::Indeterminate(Indeterminate::Now)),
            "unknown" => return Ok(TimePosition::Indeterminate(Indeterminate::Unknown)),
            _ => {}
        }
        let malformed = || TimeError::Malformed(raw.to_string());
        let (body, tz) = split_timezone(trimmed).ok_or_else(malformed)?;
        if let Ok(value) = NaiveDateTime::parse_from_str(body, DATE_TIME_FORMAT) {
            return Ok(TimePosition::At { value, tz });
        }
        let date = NaiveDate::parse_from_str(body, DATE_FORMAT).map_err(|_| malformed())?;
        Ok(TimePosition::At { value: date.and_time(NaiveTime::MIN), tz })
    }

    /// Position of a date or dateTime leaf value.
    pub fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::DateTime { value, tz } => Some(TimePosition::At { value: *value, tz: *tz }),
            TypedValue::Date { date, tz } => {
                Some(TimePosition::At { value: date.and_time(NaiveTime::MIN), tz: *tz })
            }
            _ => None,
        }
    }

    /// Absolute instant of a determinate position, using `implicit` when the
    /// position has no zone of its own.
    pub fn instant(&self, implicit: FixedOffset) -> Option<DateTime<FixedOffset>> {
        match self {
            TimePosition::At { value, tz } => tz.unwrap_or(implicit).from_local_datetime(value).single(),
            TimePosition::Indeterminate(_) => None,
        }
    }

    pub fn is_determinate(&self) -> bool {
        matches!(self, TimePosition::At { .. })
    }
}

impl fmt::Display for TimePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePosition::At { value, tz } => {
                write!(f, "{}", value.format(DATE_TIME_FORMAT))?;
                write_timezone(f, *tz)
            }
            TimePosition::Indeterminate(i) => write!(f, "{i}"),
        }
    }
}

/// A `gml:TimePeriod`. Construction rejects periods whose determinate begin lies
/// after their determinate end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    begin: TimePosition,
    end: TimePosition,
}

impl Period {
    pub fn new(begin: TimePosition, end: TimePosition) -> Result<Self, TimeError> {
        let utc = Utc.fix();
        if let (Some(b), Some(e)) = (begin.instant(utc), end.instant(utc))
            && b > e
        {
            return Err(TimeError::Inverted { begin, end });
        }
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> &TimePosition {
        &self.begin
    }

    pub fn end(&self) -> &TimePosition {
        &self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimePrimitive {
    Instant(TimePosition),
    Period(Period),
}

impl TimePrimitive {
    pub fn instant(raw: &str) -> Result<Self, TimeError> {
        TimePosition::parse(raw).map(TimePrimitive::Instant)
    }

    pub fn period(begin: &str, end: &str) -> Result<Self, TimeError> {
        Period::new(TimePosition::parse(begin)?, TimePosition::parse(end)?).map(TimePrimitive::Period)
    }

    /// Normalized `(start, end)` pair; an instant is a zero-length period.
    pub fn bounds(&self) -> (&TimePosition, &TimePosition) {
        match self {
            TimePrimitive::Instant(p) => (p, p),
            TimePrimitive::Period(p) => (&p.begin, &p.end),
        }
    }
}

impl fmt::Display for TimePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePrimitive::Instant(p) => write!(f, "TimeInstant({p})"),
            TimePrimitive::Period(p) => write!(f, "TimePeriod({} / {})", p.begin, p.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_positions_start_at_midnight() {
        let p = TimePosition::parse("2020-01-01").unwrap();
        assert_eq!(p, TimePosition::parse("2020-01-01T00:00:00").unwrap());
    }

    #[test]
    fn inverted_period_is_rejected() {
        let err = TimePrimitive::period("2020-02-01", "2020-01-01").unwrap_err();
        assert!(matches!(err, TimeError::Inverted { .. }));
    }

    #[test]
    fn indeterminate_bounds_never_invert() {
        assert!(TimePrimitive::period("after", "2020-01-01").is_ok());
        assert!(TimePrimitive::period("2020-01-01", "before").is_ok());
        assert!(TimePrimitive::period("unknown", "unknown").is_ok());
    }

    #[test]
    fn zones_are_respected_when_ordering_bounds() {
        // 10:00+02:00 is 08:00Z, which precedes 09:00Z.
        assert!(TimePrimitive::period("2020-01-01T10:00:00+02:00", "2020-01-01T09:00:00Z").is_ok());
        assert!(TimePrimitive::period("2020-01-01T10:00:00Z", "2020-01-01T11:00:00+02:00").is_err());
    }

    #[test]
    fn position_from_date_value() {
        let v = TypedValue::parse_as(&crate::value::ValueKind::Date, "2021-06-01Z").unwrap();
        let p = TimePosition::from_value(&v).unwrap();
        assert_eq!(p.to_string(), "2021-06-01T00:00:00Z");
        assert!(TimePosition::from_value(&TypedValue::text("x")).is_none());
    }

    #[test]
    fn malformed_position() {
        assert!(matches!(TimePosition::parse("yesterday"), Err(TimeError::Malformed(_))));
    }
}
