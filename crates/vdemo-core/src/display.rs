//! Text layout for a record line, shared by every panel.

use serde_json::Value;

use crate::wire::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub timestamp: String,
    pub version: String,
    pub warning: bool,
    pub body: String,
}

impl RecordLine {
    pub fn from_record(record: &Record) -> Self {
        Self {
            timestamp: format!("[ {} ]", record.timestamp),
            version: record.version.clone(),
            warning: record.is_warning(),
            body: record_body(record),
        }
    }
}

/// ` {"name" : "..."` followed by whichever optional fields are set, then `}`.
pub fn record_body(record: &Record) -> String {
    let mut body = format!(" {{\"name\" : \"{}\"", record.name);
    if let Some(age) = record.age.as_ref().filter(|age| is_truthy(age)) {
        body.push_str(&format!(", \"age\": \"{}\"", value_text(age)));
    }
    if let Some(is_adult) = record.is_adult {
        body.push_str(&format!(", \"is_adult\": \"{is_adult}\""));
    }
    if let Some(address) = record.address.as_deref().filter(|address| !address.is_empty()) {
        body.push_str(&format!(", \"address\": \"{address}\""));
    }
    body.push('}');
    body
}

// Zero, empty strings and nulls count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
