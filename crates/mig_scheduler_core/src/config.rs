pub const DEFAULT_GROUP_NAME: &str = "oracle-linux-mig";
pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_SCALE_UP_SIZE: u64 = 3;

/// Process-wide defaults applied to fields a trigger message leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub project_id: Option<String>,
    pub group_name: String,
    pub region: String,
    pub scale_up_size: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            group_name: DEFAULT_GROUP_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            scale_up_size: DEFAULT_SCALE_UP_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Builds a config from raw settings, treating blank strings and a zero
    /// scale-up size as unset.
    pub fn new(
        project_id: Option<String>,
        group_name: Option<String>,
        region: Option<String>,
        scale_up_size: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            project_id: non_blank(project_id),
            group_name: non_blank(group_name).unwrap_or(defaults.group_name),
            region: non_blank(region).unwrap_or(defaults.region),
            scale_up_size: scale_up_size
                .filter(|size| *size > 0)
                .unwrap_or(defaults.scale_up_size),
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = non_blank(Some(project_id.into()));
        self
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
