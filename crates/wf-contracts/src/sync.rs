//! Synchronization protocol response shapes.

use serde::{Deserialize, Serialize};

use crate::draft::WorkflowDraft;
use crate::editor_state::EditorState;
use crate::operation::EditOperation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncResponse {
    FullSync {
        draft: WorkflowDraft,
        seq: u64,
        editor_state: EditorState,
    },
    Incremental {
        operations: Vec<EditOperation>,
        editor_state: EditorState,
    },
    UpToDate,
}
