//! Trigger payload decoding.
//!
//! The messaging platform delivers a Pub/Sub message either wrapped in a
//! structured CloudEvent (`{"data": {"message": {...}}}`) or as the bare push
//! body (`{"message": {...}}`). `message.data` is base64 of a UTF-8 JSON object
//! carrying the [`ActionRequest`] fields.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::contract::ActionRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("trigger event must be a JSON object")]
    EventNotObject,
    #[error("trigger event carries no message data")]
    MissingData,
    #[error("message data is not valid base64: {0}")]
    Base64(String),
    #[error("message data is not valid UTF-8")]
    Utf8,
    #[error("message data is not valid JSON: {0}")]
    Json(String),
    #[error("message data must be a JSON object")]
    PayloadNotObject,
    #[error("message field '{field}' must be {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },
}

pub fn decode_trigger_event(event: &Value) -> Result<ActionRequest, DecodeError> {
    let Some(object) = event.as_object() else {
        return Err(DecodeError::EventNotObject);
    };

    let message = object
        .get("message")
        .or_else(|| object.get("data").and_then(|data| data.get("message")));

    let data = message
        .and_then(|message| message.get("data"))
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingData)?;

    decode_message_data(data)
}

pub fn decode_message_data(data: &str) -> Result<ActionRequest, DecodeError> {
    let bytes =
        base64::decode(data.trim()).map_err(|error| DecodeError::Base64(error.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    let payload: Value =
        serde_json::from_str(&text).map_err(|error| DecodeError::Json(error.to_string()))?;

    match payload {
        Value::Object(fields) => request_from_fields(&fields),
        _ => Err(DecodeError::PayloadNotObject),
    }
}

/// Inverse of [`decode_message_data`], used by publishers and tests.
pub fn encode_message_data(request: &ActionRequest) -> String {
    let mut fields = Map::new();
    if let Some(action) = &request.action {
        fields.insert("action".to_string(), json!(action));
    }
    if let Some(project_id) = &request.project_id {
        fields.insert("project_id".to_string(), json!(project_id));
    }
    if let Some(group_name) = &request.group_name {
        fields.insert("mig_name".to_string(), json!(group_name));
    }
    if let Some(region) = &request.region {
        fields.insert("region".to_string(), json!(region));
    }
    if let Some(size) = request.scale_up_size {
        fields.insert("scale_up_size".to_string(), json!(size));
    }
    base64::encode(Value::Object(fields).to_string())
}

fn request_from_fields(fields: &Map<String, Value>) -> Result<ActionRequest, DecodeError> {
    // A non-string action is kept as its JSON text so it is reported as
    // unknown rather than falling back to the default action.
    let action = match fields.get("action") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };

    let mig_name = string_field(fields, "mig_name")?;
    let group_name = string_field(fields, "group_name")?;

    let scale_up_size = match fields.get("scale_up_size") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_u64().ok_or(DecodeError::FieldType {
            field: "scale_up_size",
            expected: "a non-negative integer",
        })?),
    };

    Ok(ActionRequest {
        action,
        project_id: string_field(fields, "project_id")?,
        group_name: mig_name.or(group_name),
        region: string_field(fields, "region")?,
        scale_up_size,
    })
}

fn string_field(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(DecodeError::FieldType {
            field,
            expected: "a string",
        }),
    }
}
