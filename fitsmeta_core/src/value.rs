//! Typed metadata values and datatype coercion

use crate::error::{Result, ValidationError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metadata value
///
/// Header cards, catalog cells, defaults and calculated fields all share this
/// representation. There is no null variant: absent values are absent keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<Value>),
    /// Only produced by `date` coercion; reloads from JSON as text
    Timestamp(NaiveDateTime),
}

/// Datatype labels accepted in the fields-info document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Integer,
    Double,
    Float,
    String,
    Date,
}

impl Datatype {
    /// Parse a datatype label
    pub fn parse(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "string" | "str" => Ok(Self::String),
            "date" => Ok(Self::Date),
            _ => Err(ValidationError::unknown_datatype(label).into()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Float => "float",
            Self::String => "string",
            Self::Date => "date",
        }
    }

    /// Convert text into a value of this datatype
    pub fn convert(self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let invalid = || ValidationError::invalid_value(text, self.label());

        match self {
            Self::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| invalid().into()),
            Self::Double | Self::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid().into()),
            Self::String => Ok(Value::Text(text.to_string())),
            Self::Date => parse_timestamp(trimmed)
                .map(Value::Timestamp)
                .ok_or_else(|| invalid().into()),
        }
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

impl Value {
    /// Convert `text` according to the datatype `label`
    ///
    /// Unknown labels fail with bad-type, unparseable text with bad-value.
    pub fn convert(label: &str, text: &str) -> Result<Value> {
        Datatype::parse(label)?.convert(text)
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Coerce text to `datatype`; other variants are returned unchanged
    pub fn coerce(self, datatype: Datatype) -> Result<Value> {
        match self {
            Self::Text(text) if datatype != Datatype::String => datatype.convert(&text),
            other => Ok(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_convert_integer() {
        assert_eq!(Value::convert("integer", "42").unwrap(), Value::Integer(42));
        assert_eq!(Value::convert("integer", " 7 ").unwrap(), Value::Integer(7));
    }

    #[test]
    fn test_convert_float_labels() {
        assert_eq!(Value::convert("double", "2.5").unwrap(), Value::Float(2.5));
        assert_eq!(Value::convert("float", "1e3").unwrap(), Value::Float(1000.0));
    }

    #[test]
    fn test_convert_string_keeps_text() {
        assert_eq!(Value::convert("string", " NIRCam ").unwrap(), Value::Text(" NIRCam ".into()));
    }

    #[test]
    fn test_convert_date_forms() {
        let midnight = NaiveDate::from_ymd_opt(2022, 7, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Value::convert("date", "2022-07-12").unwrap(), Value::Timestamp(midnight));

        let value = Value::convert("date", "2022-07-12T10:20:30.5").unwrap();
        match value {
            Value::Timestamp(t) => assert_eq!(t.format("%H:%M:%S").to_string(), "10:20:30"),
            other => panic!("expected timestamp, got {other:?}"),
        }

        assert!(matches!(
            Value::convert("date", "2022-07-12T10:20:30Z").unwrap(),
            Value::Timestamp(_)
        ));
    }

    #[test]
    fn test_bad_integer_is_bad_value() {
        let err = Value::convert("integer", "abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_bad_date_is_bad_value() {
        let err = Value::convert("date", "yesterday").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_unknown_label_is_bad_type() {
        let err = Value::convert("complex", "1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadType);
    }

    #[test]
    fn test_coerce_leaves_numbers_alone() {
        let v = Value::Integer(5).coerce(Datatype::Double).unwrap();
        assert_eq!(v, Value::Integer(5));

        let v = Value::Text("5".into()).coerce(Datatype::Double).unwrap();
        assert_eq!(v, Value::Float(5.0));
    }

    #[test]
    fn test_json_shapes() {
        let v: Value = serde_json::from_str("512").unwrap();
        assert_eq!(v, Value::Integer(512));
        let v: Value = serde_json::from_str("2000.5").unwrap();
        assert_eq!(v, Value::Float(2000.5));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("[1, \"a\"]").unwrap();
        assert_eq!(
            v,
            Value::Array(vec![Value::Integer(1), Value::Text("a".into())])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Text("F444W".into()).to_string(), "F444W");
        assert_eq!(
            Value::Array(vec![Value::Integer(1), Value::Integer(2)]).to_string(),
            "[1, 2]"
        );
    }
}
