//! Detection of service-declared errors in decoded bodies.

use serde_json::{Map, Value};

use crate::error::{ChimpError, Result};
use crate::method::ApiMode;

/// Pass `body` through unless it carries an `"error"` field.
///
/// Export bodies are sequences of records; each record is checked and the
/// first one carrying the field fails the call.
pub fn classify(body: Value, mode: ApiMode) -> Result<Value> {
    match &body {
        Value::Object(map) => check(map)?,
        Value::Array(records) if mode.is_export() => {
            for record in records {
                if let Value::Object(map) = record {
                    check(map)?;
                }
            }
        }
        _ => {}
    }
    Ok(body)
}

fn check(map: &Map<String, Value>) -> Result<()> {
    let Some(error) = map.get("error") else {
        return Ok(());
    };
    let message = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Err(ChimpError::RemoteService {
        message,
        code: map.get("code").and_then(Value::as_i64),
        name: map.get("name").and_then(Value::as_str).map(str::to_string),
    })
}
