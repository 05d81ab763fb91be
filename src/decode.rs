//! Helpers for pulling typed fields out of the flat `redis::Value` arrays
//! every Lua script in `src/scripts/` returns.
//!
//! The reference coerces liberally between strings and numbers inside Lua;
//! this crate parses strictly at the boundary instead (§9 "Numeric
//! coercion"), turning a field that doesn't parse into an
//! [`EngineError::InvalidArgument`] rather than silently defaulting to zero.

use redis::Value;

use crate::error::{EngineError, EngineResult};

/// Unwrap a top-level script result into its element array, surfacing a
/// Lua `{err=...}` table as a proper error.
pub fn as_array(value: Value) -> EngineResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Nil => Ok(Vec::new()),
        other => Err(EngineError::InvalidArgument {
            name: "script_result",
            reason: format!("expected an array, got {other:?}"),
        }),
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Some(bytes.clone()),
        Value::SimpleString(s) => Some(s.as_bytes().to_vec()),
        Value::Int(n) => Some(n.to_string().into_bytes()),
        _ => None,
    }
}

/// Parse an element as UTF-8 text.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Int(n) => Some(n.to_string()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

/// Parse an element as a byte string, defaulting to empty when absent.
pub fn as_bytes_or_empty(value: Option<&Value>) -> Vec<u8> {
    value.and_then(as_bytes).unwrap_or_default()
}

/// Parse an element as `i64`, matching Lua's `tonumber(x) or 0` coercion.
pub fn as_i64_or_zero(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Int(n)) => *n,
        Some(v) => as_string(v).and_then(|s| s.parse().ok()).unwrap_or(0),
        None => 0,
    }
}

/// Parse an element as `u64`, matching Lua's `tonumber(x) or 0` coercion.
pub fn as_u64_or_zero(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Int(n)) => (*n).max(0) as u64,
        Some(v) => as_string(v).and_then(|s| s.parse().ok()).unwrap_or(0),
        None => 0,
    }
}

/// Parse a required `i64` field, failing fast when it is missing or not a
/// number (§9 "Numeric coercion").
pub fn require_i64(value: Option<&Value>, field: &'static str) -> EngineResult<i64> {
    match value {
        Some(Value::Int(n)) => Ok(*n),
        Some(v) => as_string(v)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| EngineError::InvalidArgument {
                name: field,
                reason: format!("'{v:?}' is not an integer"),
            }),
        None => Err(EngineError::InvalidArgument {
            name: field,
            reason: "missing".to_string(),
        }),
    }
}
