//! Response body decoders for the two API surfaces.
//!
//! # Design
//! Decoding is a pure function of the raw body and the mode, applied after
//! the transport returns. The standard surface answers with one JSON value.
//! The export surface answers with newline-delimited JSON: either one object
//! per line, or a header row of field names followed by rows of values.

use serde_json::{Map, Value};

use crate::error::{ChimpError, Result};
use crate::method::ApiMode;

/// A single record produced by the export decoder.
pub type Record = Map<String, Value>;

/// A decoded body together with the raw text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    pub raw: String,
    pub body: Value,
}

/// Decode `raw` according to `mode`. Export records are returned as a JSON
/// array of objects so both modes share one value type.
pub fn decode(raw: &str, mode: ApiMode) -> Result<DecodedResponse> {
    let body = match mode {
        ApiMode::Standard => decode_standard(raw)?,
        ApiMode::Export => Value::Array(decode_export(raw)?.into_iter().map(Value::Object).collect()),
    };
    Ok(DecodedResponse {
        raw: raw.to_string(),
        body,
    })
}

/// Parse a standard response: a single top-level JSON value, object or
/// array, preserved exactly. A blank body decodes to `null`.
pub fn decode_standard(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| ChimpError::Decode {
        line: e.line().saturating_sub(1),
        content: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an export response into one record per data line, in order.
pub fn decode_export(raw: &str) -> Result<Vec<Record>> {
    let mut lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((first_idx, first)) = lines.next() else {
        return Ok(Vec::new());
    };

    match parse_line(first_idx, first)? {
        Value::Object(record) => {
            let mut records = vec![record];
            for (idx, line) in lines {
                match parse_line(idx, line)? {
                    Value::Object(record) => records.push(record),
                    other => return Err(shape_error(idx, line, "object", &other)),
                }
            }
            Ok(records)
        }
        Value::Array(header) => {
            let keys: Vec<String> = header.into_iter().map(field_name).collect();
            lines
                .map(|(idx, line)| match parse_line(idx, line)? {
                    Value::Array(values) => Ok(zip_row(&keys, values)),
                    other => Err(shape_error(idx, line, "array", &other)),
                })
                .collect()
        }
        other => Err(shape_error(first_idx, first, "object or header array", &other)),
    }
}

fn parse_line(idx: usize, line: &str) -> Result<Value> {
    serde_json::from_str(line).map_err(|e| ChimpError::Decode {
        line: idx,
        content: line.to_string(),
        reason: e.to_string(),
    })
}

fn shape_error(idx: usize, line: &str, expected: &str, got: &Value) -> ChimpError {
    let kind = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ChimpError::Decode {
        line: idx,
        content: line.to_string(),
        reason: format!("expected {expected}, found {kind}"),
    }
}

fn field_name(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Pair values with header keys by position. Missing values become `null`,
/// surplus values are dropped.
fn zip_row(keys: &[String], values: Vec<Value>) -> Record {
    let mut values = values.into_iter();
    keys.iter()
        .map(|key| (key.clone(), values.next().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standard_object() {
        assert_eq!(decode_standard(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn standard_array() {
        assert_eq!(decode_standard("[1,2,3]").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn standard_blank_body_is_null() {
        assert_eq!(decode_standard("").unwrap(), Value::Null);
        assert_eq!(decode_standard(" \n").unwrap(), Value::Null);
    }

    #[test]
    fn standard_rejects_concatenated_values() {
        let err = decode_standard(r#"{"a":1},{"b":2}"#).unwrap_err();
        assert!(matches!(err, ChimpError::Decode { line: 0, .. }));
    }

    #[test]
    fn standard_malformed() {
        let err = decode_standard("not json").unwrap_err();
        match err {
            ChimpError::Decode { content, .. } => assert_eq!(content, "not json"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn export_header_rows() {
        let records = decode_export("[\"id\",\"name\"]\n[1,\"x\"]\n[2,\"y\"]").unwrap();
        assert_eq!(
            Value::Array(records.into_iter().map(Value::Object).collect()),
            json!([{"id": 1, "name": "x"}, {"id": 2, "name": "y"}])
        );
    }

    #[test]
    fn export_object_per_line() {
        let records = decode_export("{\"id\":1}\n{\"id\":2}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn export_header_only_yields_no_records() {
        assert!(decode_export("[\"id\",\"name\"]\n").unwrap().is_empty());
    }

    #[test]
    fn export_empty_body() {
        assert!(decode_export("").unwrap().is_empty());
    }

    #[test]
    fn export_short_and_long_rows() {
        let records = decode_export("[\"a\",\"b\"]\n[1]\n[1,2,3]").unwrap();
        assert_eq!(Value::Object(records[0].clone()), json!({"a": 1, "b": null}));
        assert_eq!(Value::Object(records[1].clone()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn export_field_order_follows_header() {
        let records = decode_export("[\"z\",\"a\"]\n[1,2]").unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn export_reports_offending_line() {
        let err = decode_export("[\"id\"]\n[1]\n[2,\n").unwrap_err();
        match err {
            ChimpError::Decode { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "[2,");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn export_rejects_mixed_shapes() {
        let err = decode_export("{\"id\":1}\n[2]").unwrap_err();
        assert!(matches!(err, ChimpError::Decode { line: 1, .. }));
    }

    #[test]
    fn export_rejects_scalar_first_line() {
        let err = decode_export("42\n[1]").unwrap_err();
        assert!(matches!(err, ChimpError::Decode { line: 0, .. }));
    }

    #[test]
    fn decode_keeps_raw_body() {
        let decoded = decode("{\"id\":1}\n", ApiMode::Export).unwrap();
        assert_eq!(decoded.raw, "{\"id\":1}\n");
        assert_eq!(decoded.body, json!([{"id": 1}]));
    }
}
