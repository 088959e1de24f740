//! WorkflowVersion — an immutable published snapshot of a draft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::WorkflowDraft;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVersion {
    pub id: uuid::Uuid,
    pub workflow_id: String,
    pub version_tag: String,
    #[serde(default)]
    pub changelog: String,
    pub draft: WorkflowDraft,
    pub published_at: DateTime<Utc>,
}

impl WorkflowVersion {
    pub fn publish(draft: WorkflowDraft, version_tag: impl Into<String>, changelog: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            workflow_id: draft.workflow_id.clone(),
            version_tag: version_tag.into(),
            changelog: changelog.into(),
            draft,
            published_at: Utc::now(),
        }
    }
}
