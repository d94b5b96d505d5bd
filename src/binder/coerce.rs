//! Lax scalar coercion.
//!
//! Form and query values are always text, so `"5"` has to become `5` before an `integer`
//! field validates. Conversion follows the schema: strings become integers, numbers or
//! booleans where those are declared, recursively through arrays and objects. Anything
//! that does not convert is left alone for the validator to report.

use crate::schema::{primary_type, unwrap_nullable};
use serde_json::{Map, Number, Value};

/// Coerce `value` in place toward the types `schema` declares.
pub fn coerce_lax(value: &mut Value, schema: &Value) {
    let schema = unwrap_nullable(schema);
    match (primary_type(schema), &mut *value) {
        (Some("integer"), Value::String(text)) => {
            if let Some(n) = parse_integer(text) {
                *value = Value::Number(n);
            }
        }
        (Some("number"), Value::String(text)) => {
            if let Some(n) = parse_integer(text).or_else(|| parse_float(text)) {
                *value = Value::Number(n);
            }
        }
        (Some("boolean"), Value::String(text)) => {
            if let Some(b) = parse_bool(text) {
                *value = Value::Bool(b);
            }
        }
        (Some("boolean"), Value::Number(n)) => match n.as_u64() {
            Some(0) => *value = Value::Bool(false),
            Some(1) => *value = Value::Bool(true),
            _ => {}
        },
        (Some("array"), Value::Array(items)) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    coerce_lax(item, item_schema);
                }
            }
        }
        (Some("object"), Value::Object(fields)) => coerce_object(fields, schema),
        (None, Value::String(text)) => {
            if let Some(member) = enum_member_by_text(schema, text) {
                *value = member;
            }
        }
        _ => {}
    }
}

fn coerce_object(fields: &mut Map<String, Value>, schema: &Value) {
    let properties = schema.get("properties").and_then(Value::as_object);
    let additional = schema
        .get("additionalProperties")
        .filter(|s| s.is_object());
    for (key, field) in fields.iter_mut() {
        if let Some(field_schema) = properties.and_then(|p| p.get(key)).or(additional) {
            coerce_lax(field, field_schema);
        }
    }
}

fn parse_integer(text: &str) -> Option<Number> {
    let text = text.trim();
    text.parse::<i64>()
        .map(Number::from)
        .or_else(|_| text.parse::<u64>().map(Number::from))
        .ok()
}

fn parse_float(text: &str) -> Option<Number> {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

// Numeric enums read from a query string arrive as text.
fn enum_member_by_text(schema: &Value, text: &str) -> Option<Value> {
    let members = schema.get("enum")?.as_array()?;
    if members.iter().any(|m| m.as_str() == Some(text)) {
        return None;
    }
    members
        .iter()
        .find(|m| !m.is_string() && m.to_string() == text.trim())
        .cloned()
}
