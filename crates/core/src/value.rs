//! Typed scalar values delivered by the GML parser.
//!
//! Every value carries a fixed tag ([`ValueKind`]). The lexical form produced by
//! `Display` is canonical: parsing it back under the same kind yields an equal
//! value (`TypedValue::parse_as(&v.kind(), &v.lexical()) == v` for non-null values).
//!
//! Numbers are arbitrary-precision decimals. Equality is numeric (`155.00 == 155`)
//! while the lexical form keeps the scale it was parsed with.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use core::fmt;
use core::str::FromStr;
use rust_decimal::Decimal;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Text(String),
    Boolean(bool),
    Number(Decimal),
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    DateTime {
        value: NaiveDateTime,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    Code {
        value: String,
        codespace: Option<String>,
    },
    Measure {
        value: Decimal,
        uom: String,
    },
}

/// Tag of a [`TypedValue`]. Code and measure tags carry the codespace / unit that a
/// coerced text value inherits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Text,
    Boolean,
    Number,
    Date,
    DateTime,
    Time,
    Code { codespace: Option<String> },
    Measure { uom: String },
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Null => f.write_str("null"),
            ValueKind::Text => f.write_str("text"),
            ValueKind::Boolean => f.write_str("boolean"),
            ValueKind::Number => f.write_str("number"),
            ValueKind::Date => f.write_str("date"),
            ValueKind::DateTime => f.write_str("dateTime"),
            ValueKind::Time => f.write_str("time"),
            ValueKind::Code { codespace: Some(cs) } => write!(f, "code[{cs}]"),
            ValueKind::Code { codespace: None } => f.write_str("code"),
            ValueKind::Measure { uom } => write!(f, "measure[{uom}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("incompatible values: {left} cannot be compared with {right}")]
    Incompatible { left: ValueKind, right: ValueKind },
    #[error("malformed value '{raw}' for {target_tag}")]
    Malformed { raw: String, target_tag: ValueKind },
}

impl ValueError {
    fn malformed(raw: &str, target_tag: &ValueKind) -> Self {
        ValueError::Malformed { raw: raw.to_string(), target_tag: target_tag.clone() }
    }
}

impl TypedValue {
    pub fn text(s: impl Into<String>) -> Self {
        TypedValue::Text(s.into())
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        TypedValue::Number(n.into())
    }

    /// Parse a decimal literal keeping its scale (`"155.00"` stays `155.00`).
    pub fn decimal(raw: &str) -> Result<Self, ValueError> {
        Self::parse_as(&ValueKind::Number, raw)
    }

    pub fn code(value: impl Into<String>, codespace: Option<&str>) -> Self {
        TypedValue::Code { value: value.into(), codespace: codespace.map(str::to_string) }
    }

    pub fn measure(value: impl Into<Decimal>, uom: impl Into<String>) -> Self {
        TypedValue::Measure { value: value.into(), uom: uom.into() }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Null => ValueKind::Null,
            TypedValue::Text(_) => ValueKind::Text,
            TypedValue::Boolean(_) => ValueKind::Boolean,
            TypedValue::Number(_) => ValueKind::Number,
            TypedValue::Date { .. } => ValueKind::Date,
            TypedValue::DateTime { .. } => ValueKind::DateTime,
            TypedValue::Time { .. } => ValueKind::Time,
            TypedValue::Code { codespace, .. } => ValueKind::Code { codespace: codespace.clone() },
            TypedValue::Measure { uom, .. } => ValueKind::Measure { uom: uom.clone() },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// True when both values carry the same tag, ignoring codespace and unit.
    pub fn same_tag(&self, other: &TypedValue) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Canonical lexical form.
    pub fn lexical(&self) -> String {
        self.to_string()
    }

    /// Parse `raw` under the given tag.
    pub fn parse_as(kind: &ValueKind, raw: &str) -> Result<Self, ValueError> {
        let trimmed = raw.trim();
        match kind {
            ValueKind::Null => Err(ValueError::malformed(raw, kind)),
            ValueKind::Text => Ok(TypedValue::Text(raw.to_string())),
            ValueKind::Boolean => match trimmed {
                "true" | "1" => Ok(TypedValue::Boolean(true)),
                "false" | "0" => Ok(TypedValue::Boolean(false)),
                _ => Err(ValueError::malformed(raw, kind)),
            },
            ValueKind::Number => {
                parse_decimal(trimmed).map(TypedValue::Number).ok_or_else(|| ValueError::malformed(raw, kind))
            }
            ValueKind::Date => {
                let (body, tz) = split_timezone(trimmed).ok_or_else(|| ValueError::malformed(raw, kind))?;
                let date = NaiveDate::parse_from_str(body, DATE_FORMAT)
                    .map_err(|_| ValueError::malformed(raw, kind))?;
                Ok(TypedValue::Date { date, tz })
            }
            ValueKind::DateTime => {
                let (body, tz) = split_timezone(trimmed).ok_or_else(|| ValueError::malformed(raw, kind))?;
                let value = NaiveDateTime::parse_from_str(body, DATE_TIME_FORMAT)
                    .map_err(|_| ValueError::malformed(raw, kind))?;
                Ok(TypedValue::DateTime { value, tz })
            }
            ValueKind::Time => {
                let (body, tz) = split_timezone(trimmed).ok_or_else(|| ValueError::malformed(raw, kind))?;
                let time = NaiveTime::parse_from_str(body, TIME_FORMAT)
                    .map_err(|_| ValueError::malformed(raw, kind))?;
                Ok(TypedValue::Time { time, tz })
            }
            ValueKind::Code { codespace } => {
                Ok(TypedValue::Code { value: raw.to_string(), codespace: codespace.clone() })
            }
            ValueKind::Measure { uom } => parse_decimal(trimmed)
                .map(|value| TypedValue::Measure { value, uom: uom.clone() })
                .ok_or_else(|| ValueError::malformed(raw, kind)),
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s).ok().or_else(|| {
        if s.contains(['e', 'E']) { Decimal::from_scientific(s).ok() } else { None }
    })
}

/// Split an xsd timezone suffix (`Z`, `+hh:mm`, `-hh:mm`) off a lexical date/time.
/// Returns `None` when the suffix is present but invalid.
pub(crate) fn split_timezone(raw: &str) -> Option<(&str, Option<FixedOffset>)> {
    if !raw.is_ascii() {
        return None;
    }
    if let Some(body) = raw.strip_suffix('Z') {
        return Some((body, FixedOffset::east_opt(0)));
    }
    let bytes = raw.as_bytes();
    if bytes.len() > 6 {
        let sign_at = bytes.len() - 6;
        let sign = bytes[sign_at];
        if (sign == b'+' || sign == b'-') && bytes[bytes.len() - 3] == b':' {
            let hours: i32 = raw[sign_at + 1..sign_at + 3].parse().ok()?;
            let minutes: i32 = raw[sign_at + 4..].parse().ok()?;
            if hours > 14 || minutes > 59 {
                return None;
            }
            let magnitude = hours * 3600 + minutes * 60;
            let secs = if sign == b'-' { -magnitude } else { magnitude };
            return Some((&raw[..sign_at], Some(FixedOffset::east_opt(secs)?)));
        }
    }
    Some((raw, None))
}

pub(crate) fn write_timezone(f: &mut fmt::Formatter<'_>, tz: Option<FixedOffset>) -> fmt::Result {
    let Some(tz) = tz else { return Ok(()) };
    let secs = tz.local_minus_utc();
    if secs == 0 {
        return f.write_str("Z");
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => Ok(()),
            TypedValue::Text(s) => f.write_str(s),
            TypedValue::Boolean(b) => write!(f, "{b}"),
            TypedValue::Number(d) | TypedValue::Measure { value: d, .. } => write!(f, "{d}"),
            TypedValue::Date { date, tz } => {
                write!(f, "{}", date.format(DATE_FORMAT))?;
                write_timezone(f, *tz)
            }
            TypedValue::DateTime { value, tz } => {
                write!(f, "{}", value.format(DATE_TIME_FORMAT))?;
                write_timezone(f, *tz)
            }
            TypedValue::Time { time, tz } => {
                write!(f, "{}", time.format(TIME_FORMAT))?;
                write_timezone(f, *tz)
            }
            TypedValue::Code { value, .. } => f.write_str(value),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::Text(s)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Boolean(b)
    }
}

impl From<i32> for TypedValue {
    fn from(n: i32) -> Self {
        TypedValue::Number(Decimal::from(n))
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        TypedValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for TypedValue {
    fn from(d: Decimal) -> Self {
        TypedValue::Number(d)
    }
}
