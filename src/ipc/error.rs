use serde::Serialize;
use serde_json::json;

use crate::error::GradeError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn grade_err(id: &str, e: &GradeError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

/// Success envelope around any serializable result.
pub fn ok_value<T: Serialize>(id: &str, value: &T) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(v) => ok(id, v),
        Err(e) => err(id, "internal", format!("failed to encode result: {e}"), None),
    }
}

/// Success envelope with the value under a single named key.
pub fn ok_field<T: Serialize>(id: &str, key: &str, value: &T) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(v) => {
            let mut obj = serde_json::Map::new();
            obj.insert(key.to_string(), v);
            ok(id, serde_json::Value::Object(obj))
        }
        Err(e) => err(id, "internal", format!("failed to encode result: {e}"), None),
    }
}
