//! Payload repair and decoding
//!
//! Message payloads arrive as text that is almost JSON: Python-style `nan`
//! values and single quotes are common. [`repair`] patches the known defects
//! and [`decode`] turns a message into a record, falling back to a record
//! holding only `timestamp` and `topic` when the text still does not parse.
//!
//! Messages are taken as raw JSON values so that a message with an unexpected
//! shape (no payload, non-string text) degrades to the fallback record on its
//! own instead of failing the whole page.

use crate::types::Record;
use serde_json::{Map, Value};

/// Patch the known malformations of upstream payload text
///
/// Applied in order:
/// 1. `':nan` becomes `":null`
/// 2. any remaining `nan` becomes `null`
/// 3. every `'` becomes `"`
pub fn repair(text: &str) -> String {
    text.replace("':nan", "\":null")
        .replace("nan", "null")
        .replace('\'', "\"")
}

/// Decode one message into a record
///
/// Never fails: a payload that cannot be parsed is logged and replaced by a
/// record holding only `timestamp` and `topic`.
pub fn decode(message: &Value) -> Record {
    let date = message.get("date").cloned().unwrap_or(Value::Null);
    let topic = message.get("topic").cloned().unwrap_or(Value::Null);

    let Some(text) = message
        .get("payload")
        .and_then(|payload| payload.get("text"))
        .and_then(Value::as_str)
    else {
        tracing::warn!(
            topic = %topic,
            date = %date,
            message = %message,
            "message has no payload text, keeping timestamp and topic only"
        );
        return fallback(date, topic);
    };

    let repaired = repair(text);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(mut fields)) => {
            annotate(&mut fields, date, topic);
            Value::Object(fields)
        }
        Ok(other) => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), other);
            annotate(&mut fields, date, topic);
            Value::Object(fields)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw = %text,
                repaired = %repaired,
                "failed to decode message payload, keeping timestamp and topic only"
            );
            fallback(date, topic)
        }
    }
}

/// Decode every message of a page, preserving order
pub fn decode_page(messages: &[Value]) -> Vec<Record> {
    messages.iter().map(decode).collect()
}

fn annotate(fields: &mut Map<String, Value>, date: Value, topic: Value) {
    fields.insert("timestamp".to_string(), date);
    fields.insert("topic".to_string(), topic);
}

fn fallback(date: Value, topic: Value) -> Record {
    let mut fields = Map::new();
    annotate(&mut fields, date, topic);
    Value::Object(fields)
}
