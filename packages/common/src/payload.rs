use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

/// Ordered property bag carried by a queue message.
pub type Payload = serde_json::Map<String, Value>;

/// Free-form transport headers.
pub type Headers = BTreeMap<String, String>;

/// A model that can be populated from an untrusted payload.
///
/// Only names returned by [`attribute_names`](Self::attribute_names) are ever
/// passed to [`set_attribute`](Self::set_attribute).
pub trait AttributeModel {
    fn attribute_names(&self) -> &'static [&'static str];

    /// Assign one declared attribute. Returns `false` when the value has the
    /// wrong shape for the field, in which case the field is left unchanged.
    fn set_attribute(&mut self, name: &str, value: &Value) -> bool;
}

/// Assign every payload key that is a declared attribute of `model`.
///
/// Undeclared keys and values of the wrong shape are dropped. Returns the
/// names that were assigned, in payload order.
pub fn merge_payload<M: AttributeModel + ?Sized>(model: &mut M, payload: &Payload) -> Vec<String> {
    let declared = model.attribute_names();
    let mut assigned = Vec::new();

    for (key, value) in payload {
        if !declared.contains(&key.as_str()) {
            debug!(key = %key, "Dropping undeclared payload key");
            continue;
        }
        if model.set_attribute(key, value) {
            assigned.push(key.clone());
        } else {
            debug!(key = %key, "Dropping payload value with unexpected type");
        }
    }

    assigned
}

/// Read a value as a string. Numbers and booleans are stringified; null,
/// arrays and objects are not.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a value as an integer, accepting numeric strings.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn payload_i64(payload: &Payload, key: &str) -> Option<i64> {
    payload.get(key).and_then(value_as_i64)
}

pub fn payload_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}
