//! EditorState — ephemeral per-session authoring state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{StepId, UserId};
use crate::operation::DisableMode;

/// Default window after which an unrefreshed lock becomes reclaimable.
pub const LOCK_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    pub pinned_outputs: HashMap<StepId, Value>,
    pub disabled_steps: HashMap<StepId, DisableMode>,
    pub lock_holders: HashMap<StepId, UserId>,
    pub lock_acquired_at: HashMap<StepId, DateTime<Utc>>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&mut self, step_id: StepId, value: Value) {
        self.pinned_outputs.insert(step_id, value);
    }

    pub fn unpin(&mut self, step_id: &str) {
        self.pinned_outputs.remove(step_id);
    }

    pub fn disable(&mut self, step_id: StepId, mode: DisableMode) {
        self.disabled_steps.insert(step_id, mode);
    }

    pub fn enable(&mut self, step_id: &str) {
        self.disabled_steps.remove(step_id);
    }

    /// `acquire_step_lock` semantics: succeeds if unheld, or if
    /// held by the same user (refresh); otherwise fails with the holder.
    pub fn try_acquire_lock(&mut self, step_id: StepId, user_id: UserId, now: DateTime<Utc>) -> Result<(), UserId> {
        if let Some(holder) = self.lock_holders.get(&step_id) {
            let expired = self
                .lock_acquired_at
                .get(&step_id)
                .map(|acquired| (now - *acquired).num_seconds() >= LOCK_TIMEOUT_SECS)
                .unwrap_or(true);
            if holder != &user_id && !expired {
                return Err(holder.clone());
            }
        }
        self.lock_holders.insert(step_id.clone(), user_id);
        self.lock_acquired_at.insert(step_id, now);
        Ok(())
    }

    /// Idempotent release.
    pub fn release_lock(&mut self, step_id: &str) {
        self.lock_holders.remove(step_id);
        self.lock_acquired_at.remove(step_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn lock_refresh_by_same_user_succeeds() {
        let mut state = EditorState::new();
        let now = Utc::now();
        state
            .try_acquire_lock("s1".into(), "u1".into(), now)
            .unwrap();
        state
            .try_acquire_lock("s1".into(), "u1".into(), now)
            .unwrap();
    }

    #[test]
    fn lock_by_other_user_fails() {
        let mut state = EditorState::new();
        let now = Utc::now();
        state
            .try_acquire_lock("s1".into(), "u1".into(), now)
            .unwrap();
        let err = state
            .try_acquire_lock("s1".into(), "u2".into(), now)
            .unwrap_err();
        assert_eq!(err, "u1");
    }

    #[test]
    fn lock_reclaimable_after_timeout() {
        let mut state = EditorState::new();
        let now = Utc::now();
        state
            .try_acquire_lock("s1".into(), "u1".into(), now)
            .unwrap();
        let later = now + Duration::seconds(LOCK_TIMEOUT_SECS + 1);
        state
            .try_acquire_lock("s1".into(), "u2".into(), later)
            .unwrap();
        assert_eq!(state.lock_holders.get("s1").unwrap(), "u2");
    }

    #[test]
    fn release_lock_is_idempotent() {
        let mut state = EditorState::new();
        state.release_lock("s1");
        state.release_lock("s1");
    }
}
