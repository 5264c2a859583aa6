use mig_scheduler_core::config::SchedulerConfig;
use mig_scheduler_core::contract::{ActionRequest, ScaleOutcome, ACTION_SCALE_DOWN};
use mig_scheduler_core::message::{decode_trigger_event, DecodeError};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::compute::InstanceGroupApi;
use crate::handlers::scale::process_scale_action;

/// Entry point for one delivered message.
///
/// Decoding never fails the invocation: a payload that cannot be decoded is
/// replaced by an empty request, so the configured defaults (and the
/// `scale_down` action) apply. That includes a message whose fields have the
/// wrong JSON type.
pub fn handle_trigger_event(
    event: &Value,
    config: &SchedulerConfig,
    api: &dyn InstanceGroupApi,
) -> ScaleOutcome {
    let request = match decode_trigger_event(event) {
        Ok(request) => request,
        Err(err) => fallback_request(&err),
    };

    process_request(&request, config, api)
}

/// Same as [`handle_trigger_event`] for a raw HTTP body.
pub fn handle_trigger_body(
    body: &[u8],
    config: &SchedulerConfig,
    api: &dyn InstanceGroupApi,
) -> ScaleOutcome {
    match serde_json::from_slice::<Value>(body) {
        Ok(event) => handle_trigger_event(&event, config, api),
        Err(err) => {
            error!("Error decoding message: request body is not JSON: {err}");
            process_request(&ActionRequest::default(), config, api)
        }
    }
}

fn fallback_request(err: &DecodeError) -> ActionRequest {
    error!("Error decoding message: {err}");
    ActionRequest::default()
}

fn process_request(
    request: &ActionRequest,
    config: &SchedulerConfig,
    api: &dyn InstanceGroupApi,
) -> ScaleOutcome {
    let action = request.action.as_deref().unwrap_or(ACTION_SCALE_DOWN);
    let mig = request
        .group_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(config.group_name.as_str());
    info!(action, mig, "Processing action: {action} for MIG: {mig}");

    let outcome = process_scale_action(request, config, api);

    match serde_json::to_string(&outcome) {
        Ok(record) => info!(record = %record, "Action completed: {record}"),
        Err(err) => warn!("Action completed but the result could not be serialized: {err}"),
    }
    outcome
}
