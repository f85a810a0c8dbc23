use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal value types carried by comparisons, effects and parameters.
///
/// Untagged for serde so values embed naturally in the JSON formats
/// (`42`, `3.14`, `true`, `"text"` rather than a wrapper object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
}

impl Value {
    /// Render this value as a source-text literal for the text formats.
    ///
    /// Strings are double-quoted with `"`, `\` and line-control characters
    /// escaped; everything else prints bare. The Insimul and Kismet grammars
    /// accept exactly this shape back. Escaping newlines matters for Kismet,
    /// whose grammar is line-oriented.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Value::String(s) => {
                let mut escaped = String::with_capacity(s.len() + 2);
                escaped.push('"');
                for c in s.chars() {
                    match c {
                        '\\' => escaped.push_str("\\\\"),
                        '"' => escaped.push_str("\\\""),
                        '\n' => escaped.push_str("\\n"),
                        '\r' => escaped.push_str("\\r"),
                        '\t' => escaped.push_str("\\t"),
                        other => escaped.push(other),
                    }
                }
                escaped.push('"');
                escaped
            }
            other => other.to_string(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => {
                // Keep floats re-parseable as floats: "1" would read back
                // as an Int.
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_i64() {
        assert_eq!(Value::from(42_i64), Value::Int(42));
    }

    #[test]
    fn from_f64() {
        assert_eq!(Value::from(3.14_f64), Value::Float(3.14));
    }

    #[test]
    fn from_bool() {
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn from_str() {
        assert_eq!(Value::from("hello"), Value::String("hello".to_owned()));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(3.14).to_string(), "3.14");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hello".into()).to_string(), "hello");
    }

    #[test]
    fn literal_quotes_strings() {
        assert_eq!(Value::String("hello".into()).to_literal(), "\"hello\"");
        assert_eq!(Value::Int(7).to_literal(), "7");
    }

    #[test]
    fn literal_escapes_quotes_and_backslashes() {
        let v = Value::String("a\"b\\c".into());
        assert_eq!(v.to_literal(), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn json_untagged_round_trip() {
        let values = vec![
            Value::Int(1),
            Value::Float(0.5),
            Value::Bool(false),
            Value::String("x".into()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[1,0.5,false,"x"]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
