use mig_scheduler_core::contract::{GroupInfo, GroupRef, ResizeOperation};
use thiserror::Error;

/// Narrow view of the compute control plane used by the scale handlers.
pub trait InstanceGroupApi {
    fn get_group(&self, group: &GroupRef) -> Result<GroupInfo, ComputeError>;

    /// Submits an asynchronous resize and returns its operation handle.
    fn resize_group(&self, group: &GroupRef, size: u64) -> Result<ResizeOperation, ComputeError>;
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("compute API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("compute API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to obtain access token: {0}")]
    Token(String),
    #[error("invalid compute API url: {0}")]
    InvalidUrl(String),
}

impl ComputeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
