//! Closed registry of value types and the coercions they perform.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while coercing raw text into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("invalid {type_name} value: {}", quote_repr(.raw))]
    Invalid { type_name: &'static str, raw: String },

    #[error("{type_name} value out of range: {}", quote_repr(.raw))]
    OutOfRange { type_name: &'static str, raw: String },

    #[error("unknown type '{0}' (supported: str, int, float, bool)")]
    UnknownType(String),
}

/// A symbolic type name resolved to a coercion function.
///
/// Resolution is a fixed lookup; there is no way to name a type that is
/// not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Keep the raw text as-is.
    #[default]
    Str,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Permissive truthy/falsy text, see [`strtobool`].
    Bool,
}

impl ValueType {
    /// The name used in the protocol and in help text.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }

    /// Convert raw text into a value of this type.
    pub fn coerce(self, raw: &str) -> Result<Value, CoerceError> {
        let invalid = || CoerceError::Invalid {
            type_name: self.name(),
            raw: raw.to_string(),
        };

        match self {
            ValueType::Str => Ok(Value::Str(raw.to_string())),
            ValueType::Int => match parse_int(raw) {
                Some(Ok(n)) => Ok(Value::Int(n)),
                Some(Err(_)) => Err(CoerceError::OutOfRange {
                    type_name: self.name(),
                    raw: raw.to_string(),
                }),
                None => Err(invalid()),
            },
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid()),
            ValueType::Bool => strtobool(raw).map(Value::Bool).ok_or_else(invalid),
        }
    }
}

impl FromStr for ValueType {
    type Err = CoerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(ValueType::Str),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" => Ok(ValueType::Bool),
            other => Err(CoerceError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a string representation of truth to `true` or `false`.
///
/// True values are `y`, `yes`, `t`, `true`, `on` and `1`; false values are
/// `n`, `no`, `f`, `false`, `off` and `0`, compared case-insensitively.
/// Anything else yields `None`.
pub fn strtobool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Integer literal with optional sign, surrounding whitespace and single
/// underscores between digits.
///
/// `None` when `raw` is not an integer literal; `Some(Err(_))` when it is one
/// but does not fit in an `i64`.
fn parse_int(raw: &str) -> Option<Result<i64, ParseIntError>> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '_')
    {
        return None;
    }

    Some(trimmed.replace('_', "").parse())
}

/// A coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Quoted form used in diagnostics: strings in single quotes, the rest bare.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote_repr(s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            // Debug keeps the fractional part ("8.0") so the text reads back as a float
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

fn quote_repr(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        for name in ["str", "int", "float", "bool"] {
            let ty: ValueType = name.parse().unwrap();
            assert_eq!(ty.name(), name);
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = "__import__('os')".parse::<ValueType>().unwrap_err();
        assert!(matches!(err, CoerceError::UnknownType(_)));
        assert!("list".parse::<ValueType>().is_err());
        assert!("Int".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_strtobool_truthy() {
        for raw in ["y", "YES", "t", "True", "on", "1"] {
            assert_eq!(strtobool(raw), Some(true), "{}", raw);
        }
    }

    #[test]
    fn test_strtobool_falsy() {
        for raw in ["n", "No", "f", "FALSE", "off", "0"] {
            assert_eq!(strtobool(raw), Some(false), "{}", raw);
        }
    }

    #[test]
    fn test_strtobool_rejects_other() {
        for raw in ["", "2", "maybe", "yess", " true"] {
            assert_eq!(strtobool(raw), None, "{}", raw);
        }
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(ValueType::Int.coerce("16").unwrap(), Value::Int(16));
        assert_eq!(ValueType::Int.coerce(" -3 ").unwrap(), Value::Int(-3));
        assert_eq!(ValueType::Int.coerce("+7").unwrap(), Value::Int(7));
        assert_eq!(ValueType::Int.coerce("1_000").unwrap(), Value::Int(1000));
        assert_eq!(ValueType::Int.coerce("007").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_coerce_int_invalid() {
        for raw in ["", "abc", "1.5", "1__0", "_1", "-", "0x10"] {
            let err = ValueType::Int.coerce(raw).unwrap_err();
            assert!(
                matches!(err, CoerceError::Invalid { type_name: "int", .. }),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_coerce_int_out_of_range() {
        for raw in ["99999999999999999999", "-9223372036854775809"] {
            let err = ValueType::Int.coerce(raw).unwrap_err();
            assert!(
                matches!(err, CoerceError::OutOfRange { type_name: "int", .. }),
                "{}",
                raw
            );
        }
        assert_eq!(
            ValueType::Int.coerce("99999999999999999999").unwrap_err().to_string(),
            "int value out of range: '99999999999999999999'"
        );
        assert_eq!(
            ValueType::Int.coerce("9223372036854775807").unwrap(),
            Value::Int(i64::MAX)
        );
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(ValueType::Float.coerce("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(ValueType::Float.coerce("8").unwrap(), Value::Float(8.0));
        assert_eq!(ValueType::Float.coerce("1e3").unwrap(), Value::Float(1000.0));
        assert!(ValueType::Float.coerce("one").is_err());
    }

    #[test]
    fn test_coerce_bool_uses_strtobool() {
        assert_eq!(ValueType::Bool.coerce("on").unwrap(), Value::Bool(true));
        assert_eq!(ValueType::Bool.coerce("0").unwrap(), Value::Bool(false));
        assert!(ValueType::Bool.coerce("false-ish").is_err());
    }

    #[test]
    fn test_coerce_str_keeps_text() {
        let raw = "  $(rm -rf /) `x` \n";
        assert_eq!(ValueType::Str.coerce(raw).unwrap(), Value::Str(raw.to_string()));
    }

    #[test]
    fn test_display_reads_back() {
        assert_eq!(Value::Int(16).to_string(), "16");
        assert_eq!(Value::Float(8.0).to_string(), "8.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Bool(true).to_string(), "true");

        let text = Value::Float(1e20).to_string();
        assert_eq!(ValueType::Float.coerce(&text).unwrap(), Value::Float(1e20));
    }

    #[test]
    fn test_invalid_message() {
        let err = ValueType::Int.coerce("abc").unwrap_err();
        assert_eq!(err.to_string(), "invalid int value: 'abc'");
    }

    #[test]
    fn test_repr() {
        assert_eq!(Value::Str("en".into()).repr(), "'en'");
        assert_eq!(Value::Str("it's".into()).repr(), "'it\\'s'");
        assert_eq!(Value::Int(2).repr(), "2");
    }
}
