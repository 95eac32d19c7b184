//! Task identity and workflow settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    #[default]
    Cross,
    HierarchicalCorrection,
    ValidationOnly,
    /// Several annotators label the same pages; the validator merges their work
    ExtensiveCoverage,
}

impl ValidationType {
    /// Whether other annotators' work is overlaid for review.
    pub fn is_split(self) -> bool {
        self == ValidationType::ExtensiveCoverage
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSettings {
    pub task_id: u64,
    pub job_id: u64,
    pub file_id: u64,
    pub user_id: String,
    #[serde(default)]
    pub validation_type: ValidationType,
}

impl TaskSettings {
    pub fn new(task_id: u64, job_id: u64, file_id: u64, user_id: impl Into<String>) -> Self {
        Self {
            task_id,
            job_id,
            file_id,
            user_id: user_id.into(),
            validation_type: ValidationType::default(),
        }
    }

    pub fn with_validation_type(mut self, validation_type: ValidationType) -> Self {
        self.validation_type = validation_type;
        self
    }
}
