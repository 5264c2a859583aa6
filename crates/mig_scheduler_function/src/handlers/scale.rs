use mig_scheduler_core::config::SchedulerConfig;
use mig_scheduler_core::contract::{
    ActionRequest, GroupInfo, GroupRef, ResizeReport, ResizeResult, ScaleError, ScaleOutcome,
};
use mig_scheduler_core::decision::{plan_scale, resolve_request, ScalePlan};
use tracing::{error, info};

use crate::adapters::compute::InstanceGroupApi;

/// Reads the current state of a group, collapsing every failure to `None`.
pub fn read_group_info(api: &dyn InstanceGroupApi, group: &GroupRef) -> Option<GroupInfo> {
    match api.get_group(group) {
        Ok(info) => Some(info),
        Err(err) => {
            error!(
                mig = %group.name,
                region = %group.region,
                project = %group.project,
                not_found = err.is_not_found(),
                "Error getting MIG {} in region {}: {err}",
                group.name,
                group.region
            );
            None
        }
    }
}

pub fn scale_down(api: &dyn InstanceGroupApi, group: &GroupRef) -> ResizeResult {
    submit_resize(api, group, 0, "down")
}

pub fn scale_up(api: &dyn InstanceGroupApi, group: &GroupRef, target_size: u64) -> ResizeResult {
    submit_resize(api, group, target_size, "up")
}

fn submit_resize(
    api: &dyn InstanceGroupApi,
    group: &GroupRef,
    target_size: u64,
    direction: &str,
) -> ResizeResult {
    match api.resize_group(group, target_size) {
        Ok(operation) => {
            info!(
                mig = %group.name,
                region = %group.region,
                operation = %operation.name,
                "Scaling {direction} MIG {} to {target_size} instances in region {}",
                group.name,
                group.region
            );
            ResizeResult::Success {
                operation: operation.name,
                target_size,
            }
        }
        Err(err) => {
            error!(
                mig = %group.name,
                region = %group.region,
                "Error scaling {direction} MIG {}: {err}",
                group.name
            );
            ResizeResult::Error {
                message: err.to_string(),
            }
        }
    }
}

/// Runs one scale request: resolve, read, decide, and issue at most one resize.
pub fn process_scale_action(
    request: &ActionRequest,
    config: &SchedulerConfig,
    api: &dyn InstanceGroupApi,
) -> ScaleOutcome {
    let resolved = match resolve_request(request, config) {
        Ok(value) => value,
        Err(err) => {
            error!("{err}");
            return err.into();
        }
    };
    let group = &resolved.group;

    let Some(current) = read_group_info(api, group) else {
        error!(
            mig = %group.name,
            region = %group.region,
            "MIG {} not found in region {}",
            group.name,
            group.region
        );
        return ScaleError::GroupNotFound {
            name: group.name.clone(),
        }
        .into();
    };

    info!(
        mig = %group.name,
        target_size = current.target_size,
        is_stable = current.is_stable,
        "Current MIG size: {}",
        current.target_size
    );

    match plan_scale(resolved.action, current.target_size, resolved.scale_up_size) {
        ScalePlan::AlreadyScaledDown => {
            info!(mig = %group.name, "MIG {} already scaled down to 0", group.name);
            ScaleOutcome::already_scaled_down()
        }
        ScalePlan::AlreadyScaledUp { current_size } => {
            info!(
                mig = %group.name,
                "MIG {} already at or above target size {}",
                group.name,
                resolved.scale_up_size
            );
            ScaleOutcome::already_scaled_up(current_size)
        }
        ScalePlan::Resize {
            action,
            previous_size,
            new_size,
        } => {
            let result = if new_size == 0 {
                scale_down(api, group)
            } else {
                scale_up(api, group, new_size)
            };
            ScaleOutcome::Resized(ResizeReport {
                action,
                mig: group.name.clone(),
                region: group.region.clone(),
                previous_size,
                new_size,
                result,
            })
        }
    }
}
