use mig_scheduler_function::runtime::contract::ActionRequest;
use mig_scheduler_function::runtime::message::encode_message_data;
use serde_json::{json, Value};

/// Pub/Sub push body as delivered to the HTTP entry point.
pub fn push_event(data: &str) -> Value {
    json!({
        "message": {
            "data": data,
            "messageId": "9876543210",
            "publishTime": "2026-10-18T06:00:00Z",
        },
        "subscription": "projects/demo-project/subscriptions/mig-scheduler",
    })
}

pub fn event_for(request: &ActionRequest) -> Value {
    push_event(&encode_message_data(request))
}

pub fn scale_up(size: u64) -> ActionRequest {
    ActionRequest {
        action: Some("scale_up".to_string()),
        scale_up_size: Some(size),
        ..ActionRequest::default()
    }
}

pub fn scale_down() -> ActionRequest {
    ActionRequest {
        action: Some("scale_down".to_string()),
        ..ActionRequest::default()
    }
}
