//! Comparable value bridge.
//!
//! Two [`TypedValue`]s with the same tag compare directly. When exactly one side
//! is text, the text is parsed under the other side's tag first, so a property
//! value typed as number compares against a literal `'155.00'` numerically.
//! Any other pairing of tags is a caller error.
//!
//! Dates, dateTimes and times are normalised to absolute instants using the
//! implicit timezone for values without one. Times are anchored on
//! 2000-01-01 so that only the time of day takes part in the comparison.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use core::cmp::Ordering;
use geofes_core::{TypedValue, ValueError};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// When false, text and code values compare case-insensitively.
    pub match_case: bool,
    pub implicit_timezone: FixedOffset,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self { match_case: true, implicit_timezone: Utc.fix() }
    }
}

/// A value normalised for comparison. Only values of the same variant are
/// ordered against each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Text(String),
    Boolean(bool),
    Number(Decimal),
    Date(DateTime<FixedOffset>),
    DateTime(DateTime<FixedOffset>),
    Time(DateTime<FixedOffset>),
    Code { value: String, codespace: Option<String> },
    Measure { value: Decimal, uom: String },
}

impl Comparable {
    /// Whether `<`, `>` and friends are meaningful for this family.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Comparable::Boolean(_) | Comparable::Code { .. })
    }
}

impl PartialOrd for Comparable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Comparable as C;
        match (self, other) {
            (C::Text(a), C::Text(b)) => Some(a.cmp(b)),
            (C::Boolean(a), C::Boolean(b)) => Some(a.cmp(b)),
            (C::Number(a), C::Number(b)) => Some(a.cmp(b)),
            (C::Date(a), C::Date(b)) | (C::DateTime(a), C::DateTime(b)) | (C::Time(a), C::Time(b)) => {
                Some(a.cmp(b))
            }
            // a missing codespace on either side imposes no constraint
            (C::Code { value: a, codespace: ca }, C::Code { value: b, codespace: cb })
                if ca.is_none() || cb.is_none() || ca == cb =>
            {
                Some(a.cmp(b))
            }
            (C::Measure { value: a, uom: ua }, C::Measure { value: b, uom: ub }) if ua == ub => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Bring two values into the same comparable family.
pub fn make_comparable(
    a: &TypedValue,
    b: &TypedValue,
    opts: &CompareOptions,
) -> Result<(Comparable, Comparable), ValueError> {
    let incompatible = || ValueError::Incompatible { left: a.kind(), right: b.kind() };
    let (left, right) = match (a, b) {
        (TypedValue::Null, _) | (_, TypedValue::Null) => return Err(incompatible()),
        (TypedValue::Text(_), TypedValue::Text(_)) => (a.clone(), b.clone()),
        (TypedValue::Text(raw), other) => (TypedValue::parse_as(&other.kind(), raw)?, other.clone()),
        (other, TypedValue::Text(raw)) => (other.clone(), TypedValue::parse_as(&other.kind(), raw)?),
        (
            TypedValue::Code { codespace: Some(ca), .. },
            TypedValue::Code { codespace: Some(cb), .. },
        ) if ca != cb => return Err(incompatible()),
        (TypedValue::Measure { uom: ua, .. }, TypedValue::Measure { uom: ub, .. }) if ua != ub => {
            return Err(incompatible());
        }
        _ if a.same_tag(b) => (a.clone(), b.clone()),
        _ => return Err(incompatible()),
    };
    Ok((to_comparable(left, opts)?, to_comparable(right, opts)?))
}

/// Total order of two compatible values.
pub fn compare(a: &TypedValue, b: &TypedValue, opts: &CompareOptions) -> Result<Ordering, ValueError> {
    let (left, right) = make_comparable(a, b, opts)?;
    left.partial_cmp(&right).ok_or_else(|| ValueError::Incompatible { left: a.kind(), right: b.kind() })
}

fn to_comparable(v: TypedValue, opts: &CompareOptions) -> Result<Comparable, ValueError> {
    let fold = |s: String| if opts.match_case { s } else { s.to_lowercase() };
    let tz = opts.implicit_timezone;
    Ok(match v {
        TypedValue::Text(s) => Comparable::Text(fold(s)),
        TypedValue::Boolean(b) => Comparable::Boolean(b),
        TypedValue::Number(n) => Comparable::Number(n),
        TypedValue::Date { date, tz: own } => {
            Comparable::Date(anchor(date.and_time(NaiveTime::MIN), own.unwrap_or(tz), &v)?)
        }
        TypedValue::DateTime { value, tz: own } => Comparable::DateTime(anchor(value, own.unwrap_or(tz), &v)?),
        TypedValue::Time { time, tz: own } => {
            Comparable::Time(anchor(time_base().and_time(time), own.unwrap_or(tz), &v)?)
        }
        TypedValue::Code { value, codespace } => Comparable::Code { value: fold(value), codespace },
        TypedValue::Measure { value, uom } => Comparable::Measure { value, uom },
        TypedValue::Null => {
            return Err(ValueError::Incompatible { left: v.kind(), right: v.kind() });
        }
    })
}

fn time_base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn anchor(local: NaiveDateTime, tz: FixedOffset, original: &TypedValue) -> Result<DateTime<FixedOffset>, ValueError> {
    tz.from_local_datetime(&local)
        .single()
        .ok_or_else(|| ValueError::Malformed { raw: original.lexical(), target_tag: original.kind() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_and_code_are_unordered() {
        assert!(!Comparable::Boolean(true).is_ordered());
        assert!(!Comparable::Code { value: "a".into(), codespace: None }.is_ordered());
        assert!(Comparable::Number(Decimal::ONE).is_ordered());
    }

    #[test]
    fn different_families_do_not_order() {
        let n = Comparable::Number(Decimal::ONE);
        let t = Comparable::Text("1".into());
        assert_eq!(n.partial_cmp(&t), None);
    }

    #[test]
    fn case_folding_applies_to_text_and_code() {
        let opts = CompareOptions { match_case: false, ..CompareOptions::default() };
        let ord = compare(&TypedValue::text("Main St"), &TypedValue::text("MAIN st"), &opts).unwrap();
        assert_eq!(ord, Ordering::Equal);
        let ord = compare(&TypedValue::code("ab", None), &TypedValue::code("AB", None), &opts).unwrap();
        assert_eq!(ord, Ordering::Equal);
    }
}
