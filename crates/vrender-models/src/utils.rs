//! Lenient coercions for loosely-typed JSON request bodies.
//!
//! Clients send whatever their form library produces: numbers as strings,
//! `null` for cleared fields, `0`/`""` for "unset". These helpers implement
//! the "falsy means default" reading of such values.

use serde_json::Value;

/// Truthiness of a JSON value.
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy; everything else
/// (including empty arrays and objects) is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// A number, or a string holding one. Falsy and non-numeric values yield `None`.
pub fn truthy_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n != 0.0 && n.is_finite()).then_some(n)
}

/// A non-empty string. Numbers are rendered with their JSON representation.
pub fn truthy_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if is_truthy(value) => Some(n.to_string()),
        _ => None,
    }
}
