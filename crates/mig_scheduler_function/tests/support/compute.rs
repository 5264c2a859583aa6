use std::collections::HashMap;
use std::sync::Mutex;

use mig_scheduler_function::adapters::compute::{ComputeError, InstanceGroupApi};
use mig_scheduler_function::runtime::contract::{GroupInfo, GroupRef, ResizeOperation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(GroupRef),
    Resize(GroupRef, u64),
}

/// In-memory control plane keyed by (region, name). Resizes apply immediately.
#[derive(Default)]
pub struct InMemoryCompute {
    groups: Mutex<HashMap<(String, String), u64>>,
    calls: Mutex<Vec<Call>>,
    resize_failure: Option<String>,
}

impl InMemoryCompute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, region: &str, name: &str, target_size: u64) -> Self {
        self.groups
            .lock()
            .expect("poisoned mutex")
            .insert((region.to_string(), name.to_string()), target_size);
        self
    }

    pub fn failing_resizes(mut self, message: &str) -> Self {
        self.resize_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn resize_calls(&self) -> Vec<(GroupRef, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Resize(group, size) => Some((group, size)),
                Call::Get(_) => None,
            })
            .collect()
    }

    pub fn target_size(&self, region: &str, name: &str) -> Option<u64> {
        self.groups
            .lock()
            .expect("poisoned mutex")
            .get(&(region.to_string(), name.to_string()))
            .copied()
    }
}

impl InstanceGroupApi for InMemoryCompute {
    fn get_group(&self, group: &GroupRef) -> Result<GroupInfo, ComputeError> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push(Call::Get(group.clone()));

        let groups = self.groups.lock().expect("poisoned mutex");
        match groups.get(&(group.region.clone(), group.name.clone())) {
            Some(target_size) => Ok(GroupInfo {
                name: group.name.clone(),
                region: group.region.clone(),
                target_size: *target_size,
                is_stable: true,
            }),
            None => Err(ComputeError::Api {
                status: 404,
                message: format!("The resource '{}' was not found", group.name),
            }),
        }
    }

    fn resize_group(&self, group: &GroupRef, size: u64) -> Result<ResizeOperation, ComputeError> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push(Call::Resize(group.clone(), size));

        if let Some(message) = &self.resize_failure {
            return Err(ComputeError::Api {
                status: 400,
                message: message.clone(),
            });
        }

        self.groups
            .lock()
            .expect("poisoned mutex")
            .insert((group.region.clone(), group.name.clone()), size);
        Ok(ResizeOperation {
            name: format!("operation-{}-{size}", group.name),
        })
    }
}
