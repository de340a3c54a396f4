use serde_json::Value;

use crate::error::HistoryError;
use crate::records::Record;

use super::FetchResult;

/// Pull the `data` array of record objects out of a historical API response body.
pub fn extract_records(body: &str, context: &str) -> FetchResult<Vec<Record>> {
    let root: Value = serde_json::from_str(body).map_err(|err| {
        HistoryError::remote(format!("Failed to parse {context} JSON: {err}"))
    })?;

    let data = match root {
        Value::Object(mut map) => map.remove("data"),
        _ => None,
    };

    let Some(Value::Array(rows)) = data else {
        return Err(HistoryError::remote(format!(
            "{context} payload missing `data` array"
        )));
    };

    rows.into_iter()
        .map(|row| match row {
            Value::Object(record) => Ok(record),
            other => Err(HistoryError::remote(format!(
                "Unexpected {context} row: {other}"
            ))),
        })
        .collect()
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
