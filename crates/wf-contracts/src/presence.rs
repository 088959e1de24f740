//! UserPresence — ephemeral per-connection presence state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{StepId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPresence {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    #[serde(default)]
    pub selected_step_ids: Vec<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_step_id: Option<StepId>,
    pub joined_at: DateTime<Utc>,
}

impl UserPresence {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            cursor: None,
            selected_step_ids: Vec::new(),
            focused_step_id: None,
            joined_at: Utc::now(),
        }
    }

    /// Merge an update into this entry — last write wins per field.
    pub fn merge(&mut self, update: PresenceUpdate) {
        if let Some(cursor) = update.cursor {
            self.cursor = Some(cursor);
        }
        if let Some(selection) = update.selected_step_ids {
            self.selected_step_ids = selection;
        }
        if let Some(focused) = update.focused_step_id {
            self.focused_step_id = focused;
        }
    }
}

/// A partial update to one user's presence entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(default)]
    pub cursor: Option<CursorPosition>,
    #[serde(default)]
    pub selected_step_ids: Option<Vec<StepId>>,
    /// `Some(None)` clears focus, `None` leaves it untouched.
    #[serde(default)]
    pub focused_step_id: Option<Option<StepId>>,
}

/// Event broadcast on `workflow:<id>:presence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    Joined { presence: UserPresence },
    Updated { presence: UserPresence },
    Left { user_id: UserId },
}
