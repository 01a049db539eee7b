//! Raw submission archive record.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};

use crate::gateway::Payload;
use crate::{AppError, Result};

/// Backend model archiving every received submission verbatim.
pub const SUBMISSION_MODEL: &str = "health.odk.submission";

/// Field holding the serialized submission.
pub const BLOB_FIELD: &str = "odk_submitted_object";

/// Wrap the whole submission as a key-sorted JSON blob indented by four
/// spaces, with `is_processed = false`.
///
/// # Errors
///
/// Returns `AppError::Input` if serialization fails.
pub fn build_submission(fields: &Map<String, Value>) -> Result<Payload> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    sorted(fields).serialize(&mut ser)?;
    let blob = String::from_utf8(buf)
        .map_err(|err| AppError::Input(format!("submission blob is not utf-8: {err}")))?;

    let mut payload = Payload::new();
    payload.insert(BLOB_FIELD.into(), Value::from(blob));
    payload.insert("is_processed".into(), Value::Bool(false));
    Ok(payload)
}

/// Parse a stored blob back into a submission object.
///
/// # Errors
///
/// Returns `AppError::Input` if the blob is not valid JSON.
pub fn parse_blob(blob: &str) -> Result<Value> {
    Ok(serde_json::from_str(blob)?)
}

// serde_json may be built with `preserve_order`; sort explicitly.
fn sorted(fields: &Map<String, Value>) -> Value {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();
    let mut out = Map::new();
    for key in keys {
        out.insert(key.clone(), sort_value(&fields[key]));
    }
    Value::Object(out)
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => sorted(map),
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}
