use crate::config::{non_blank, SchedulerConfig};
use crate::contract::{ActionRequest, GroupRef, ScaleAction, ScaleError};

/// Request with every default applied and the action validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub group: GroupRef,
    pub action: ScaleAction,
    /// Target for `scale_up`; carried for `scale_down` too but unused there.
    pub scale_up_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePlan {
    AlreadyScaledDown,
    AlreadyScaledUp { current_size: u64 },
    Resize {
        action: ScaleAction,
        previous_size: u64,
        new_size: u64,
    },
}

/// Applies configuration fallbacks to a request.
///
/// The project check runs first, then the action check, so neither failure
/// ever reaches the compute API.
pub fn resolve_request(
    request: &ActionRequest,
    config: &SchedulerConfig,
) -> Result<ResolvedRequest, ScaleError> {
    let project = non_blank(request.project_id.clone())
        .or_else(|| config.project_id.clone())
        .ok_or(ScaleError::ProjectNotConfigured)?;

    let action = match request.action.as_deref() {
        None => ScaleAction::ScaleDown,
        Some(raw) => raw.parse()?,
    };

    let name = non_blank(request.group_name.clone()).unwrap_or_else(|| config.group_name.clone());
    let region = non_blank(request.region.clone()).unwrap_or_else(|| config.region.clone());
    let scale_up_size = request
        .scale_up_size
        .filter(|size| *size > 0)
        .unwrap_or(config.scale_up_size);

    Ok(ResolvedRequest {
        group: GroupRef {
            project,
            region,
            name,
        },
        action,
        scale_up_size,
    })
}

/// Decides whether the group needs a resize given its current target size.
pub fn plan_scale(action: ScaleAction, current_size: u64, scale_up_size: u64) -> ScalePlan {
    match action {
        ScaleAction::ScaleDown if current_size == 0 => ScalePlan::AlreadyScaledDown,
        ScaleAction::ScaleDown => ScalePlan::Resize {
            action,
            previous_size: current_size,
            new_size: 0,
        },
        ScaleAction::ScaleUp if current_size >= scale_up_size => ScalePlan::AlreadyScaledUp {
            current_size,
        },
        ScaleAction::ScaleUp => ScalePlan::Resize {
            action,
            previous_size: current_size,
            new_size: scale_up_size,
        },
    }
}
