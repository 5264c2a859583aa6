use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ACTION_SCALE_UP: &str = "scale_up";
pub const ACTION_SCALE_DOWN: &str = "scale_down";

pub const ALREADY_SCALED_DOWN_MESSAGE: &str = "MIG already scaled down";
pub const ALREADY_SCALED_UP_MESSAGE: &str = "MIG already scaled up";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAction {
    ScaleUp,
    ScaleDown,
}

impl ScaleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScaleUp => ACTION_SCALE_UP,
            Self::ScaleDown => ACTION_SCALE_DOWN,
        }
    }
}

impl fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleAction {
    type Err = ScaleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            ACTION_SCALE_UP => Ok(Self::ScaleUp),
            ACTION_SCALE_DOWN => Ok(Self::ScaleDown),
            other => Err(ScaleError::UnknownAction(other.to_string())),
        }
    }
}

/// Scale intent carried by one trigger message.
///
/// Every field is optional; unset fields fall back to [`crate::config::SchedulerConfig`].
/// `action` stays a raw string so an unrecognised value can be reported back
/// verbatim instead of being dropped during decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_up_size: Option<u64>,
}

/// Fully resolved address of a regional managed instance group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub project: String,
    pub region: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub region: String,
    pub target_size: u64,
    pub is_stable: bool,
}

/// Handle of an asynchronous resize submitted to the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResizeOperation {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResizeResult {
    Success { operation: String, target_size: u64 },
    Error { message: String },
}

impl ResizeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResizeReport {
    pub action: ScaleAction,
    pub mig: String,
    pub region: String,
    pub previous_size: u64,
    pub new_size: u64,
    pub result: ResizeResult,
}

/// Record returned (and logged) by one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScaleOutcome {
    Failed { error: String },
    Unchanged { message: String, target_size: u64 },
    Resized(ResizeReport),
}

impl ScaleOutcome {
    pub fn already_scaled_down() -> Self {
        Self::Unchanged {
            message: ALREADY_SCALED_DOWN_MESSAGE.to_string(),
            target_size: 0,
        }
    }

    pub fn already_scaled_up(current_size: u64) -> Self {
        Self::Unchanged {
            message: ALREADY_SCALED_UP_MESSAGE.to_string(),
            target_size: current_size,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl From<ScaleError> for ScaleOutcome {
    fn from(error: ScaleError) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("Project ID not configured")]
    ProjectNotConfigured,
    #[error("MIG {name} not found")]
    GroupNotFound { name: String },
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn parses_recognised_actions_and_rejects_others() {
        assert_eq!("scale_up".parse::<ScaleAction>(), Ok(ScaleAction::ScaleUp));
        assert_eq!(
            "scale_down".parse::<ScaleAction>(),
            Ok(ScaleAction::ScaleDown)
        );
        assert_eq!(
            "pause".parse::<ScaleAction>(),
            Err(ScaleError::UnknownAction("pause".to_string()))
        );
        assert!("SCALE_UP".parse::<ScaleAction>().is_err());
    }

    #[test]
    fn error_records_use_stable_texts() {
        let outcome = ScaleOutcome::from(ScaleError::ProjectNotConfigured);
        assert_eq!(
            serde_json::to_value(&outcome).expect("outcome should serialize"),
            json!({"error": "Project ID not configured"})
        );

        let outcome = ScaleOutcome::from(ScaleError::UnknownAction("pause".to_string()));
        assert_eq!(outcome.error_message(), Some("Unknown action: pause"));

        let outcome = ScaleOutcome::from(ScaleError::GroupNotFound {
            name: "batch-mig".to_string(),
        });
        assert_eq!(outcome.error_message(), Some("MIG batch-mig not found"));
    }

    #[test]
    fn resized_record_nests_resize_status() {
        let outcome = ScaleOutcome::Resized(ResizeReport {
            action: ScaleAction::ScaleUp,
            mig: "oracle-linux-mig".to_string(),
            region: "us-central1".to_string(),
            previous_size: 2,
            new_size: 5,
            result: ResizeResult::Error {
                message: "quota exceeded".to_string(),
            },
        });

        let value: Value = serde_json::to_value(&outcome).expect("outcome should serialize");
        assert_eq!(value["action"], "scale_up");
        assert_eq!(value["previous_size"], 2);
        assert_eq!(value["result"]["status"], "error");
        assert_eq!(value["result"]["message"], "quota exceeded");
    }

    #[test]
    fn short_circuit_record_shape() {
        let value = serde_json::to_value(ScaleOutcome::already_scaled_up(4))
            .expect("outcome should serialize");
        assert_eq!(
            value,
            json!({"message": "MIG already scaled up", "target_size": 4})
        );
    }
}
