//! Value kinds and conversion for realtime bindings.
//!
//! A widget bound to a realtime path declares the kind of value it expects.
//! Raw store values are coerced into that kind before they reach the widget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Expected shape of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueKind::String),
            "number" => Ok(ValueKind::Number),
            "boolean" => Ok(ValueKind::Boolean),
            "object" => Ok(ValueKind::Object),
            other => Err(CoreError::Validation(format!("Unknown value kind: {other}"))),
        }
    }
}

/// Lifecycle of a live binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Coerce a raw store value into `kind`.
///
/// `null` always passes through untouched so widgets can tell "no data" apart
/// from a zero or an empty string. For [`ValueKind::Object`] arrays are kept
/// as they are; only scalars become an empty object.
pub fn convert_value(value: Value, kind: ValueKind) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    match kind {
        ValueKind::String => Value::String(to_text(&value)),
        ValueKind::Number => to_number(&value),
        ValueKind::Boolean => Value::Bool(truthy(&value)),
        ValueKind::Object => match value {
            Value::Object(_) | Value::Array(_) => value,
            _ => Value::Object(Map::new()),
        },
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Value::from(0);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(normalize_number)
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

/// Keep integral results as JSON integers so `"21"` converts to `21`, not `21.0`.
fn normalize_number(n: Number) -> Value {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
        _ => Value::Number(n),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_passes_through_for_every_kind() {
        for kind in [
            ValueKind::String,
            ValueKind::Number,
            ValueKind::Boolean,
            ValueKind::Object,
        ] {
            assert_eq!(convert_value(Value::Null, kind), Value::Null);
        }
    }

    #[test]
    fn string_conversion() {
        assert_eq!(convert_value(json!(23.5), ValueKind::String), json!("23.5"));
        assert_eq!(convert_value(json!(true), ValueKind::String), json!("true"));
        assert_eq!(convert_value(json!("on"), ValueKind::String), json!("on"));
    }

    #[test]
    fn number_conversion() {
        assert_eq!(convert_value(json!("21"), ValueKind::Number), json!(21));
        assert_eq!(convert_value(json!(" 21.5 "), ValueKind::Number), json!(21.5));
        assert_eq!(convert_value(json!(true), ValueKind::Number), json!(1));
        assert_eq!(convert_value(json!(false), ValueKind::Number), json!(0));
        assert_eq!(convert_value(json!(""), ValueKind::Number), json!(0));
        assert_eq!(convert_value(json!("warm"), ValueKind::Number), Value::Null);
        assert_eq!(convert_value(json!({"a": 1}), ValueKind::Number), Value::Null);
    }

    #[test]
    fn boolean_conversion_uses_truthiness() {
        assert_eq!(convert_value(json!(0), ValueKind::Boolean), json!(false));
        assert_eq!(convert_value(json!(2), ValueKind::Boolean), json!(true));
        assert_eq!(convert_value(json!(""), ValueKind::Boolean), json!(false));
        assert_eq!(convert_value(json!("false"), ValueKind::Boolean), json!(true));
        assert_eq!(convert_value(json!({}), ValueKind::Boolean), json!(true));
    }

    #[test]
    fn object_conversion_replaces_scalars_with_empty_object() {
        let obj = json!({"temp": 21});
        assert_eq!(convert_value(obj.clone(), ValueKind::Object), obj);
        assert_eq!(convert_value(json!(5), ValueKind::Object), json!({}));
        assert_eq!(convert_value(json!("on"), ValueKind::Object), json!({}));
    }

    #[test]
    fn object_conversion_keeps_arrays() {
        let rows = json!([{"id": "pump-1"}, {"id": "pump-2"}]);
        assert_eq!(convert_value(rows.clone(), ValueKind::Object), rows);
        assert_eq!(convert_value(json!([]), ValueKind::Object), json!([]));
    }

    #[test]
    fn kind_parses_from_wire_name() {
        assert_eq!("boolean".parse::<ValueKind>().unwrap(), ValueKind::Boolean);
        assert!("float".parse::<ValueKind>().is_err());
        assert_eq!(serde_json::to_value(ValueKind::Object).unwrap(), "object");
    }
}
