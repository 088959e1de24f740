//! Pure application of a validated `OperationPayload` to a draft and/or
//! editor state. Same input + same op always produces the same output —
//! callers are expected to have already run `validate`.

use serde_json::Value;
use wf_contracts::{EditorState, OperationPayload, PatchOp, ValidationError, WorkflowDraft};

/// Applies the structural half of the vocabulary to the draft. No-op for
/// editor-only payloads (pin/unpin/disable/enable), which `apply_editor`
/// handles instead.
pub fn apply_structural(draft: &mut WorkflowDraft, payload: &OperationPayload) -> Result<(), ValidationError> {
    match payload {
        OperationPayload::AddStep { step } => {
            draft.steps.push(step.clone());
        }
        OperationPayload::RemoveStep { step_id } => {
            draft.remove_step_cascading(step_id);
        }
        OperationPayload::UpdateStepConfig { step_id, patch } => {
            let step = draft
                .step_mut(step_id)
                .ok_or_else(|| ValidationError::StepNotFound { step_id: step_id.clone() })?;
            apply_patch(&mut step.config, patch)?;
        }
        OperationPayload::UpdateStepPosition { step_id, position } => {
            let step = draft
                .step_mut(step_id)
                .ok_or_else(|| ValidationError::StepNotFound { step_id: step_id.clone() })?;
            step.position = position.clone();
        }
        OperationPayload::UpdateStepMetadata { step_id, changes } => {
            let step = draft
                .step_mut(step_id)
                .ok_or_else(|| ValidationError::StepNotFound { step_id: step_id.clone() })?;
            if let Some(name) = &changes.name {
                step.name = name.clone();
            }
            if let Some(notes) = &changes.notes {
                step.notes = Some(notes.clone());
            }
            if let Some(config) = &changes.config {
                step.config = config.clone();
            }
        }
        OperationPayload::AddConnection { connection } => {
            draft.connections.push(connection.clone());
        }
        OperationPayload::RemoveConnection { connection_id } => {
            draft.connections.retain(|c| &c.id != connection_id);
        }
        OperationPayload::PinStepOutput { .. }
        | OperationPayload::UnpinStepOutput { .. }
        | OperationPayload::DisableStep { .. }
        | OperationPayload::EnableStep { .. } => {}
    }
    Ok(())
}

/// Applies the editor-state half of the vocabulary. No-op for structural
/// payloads.
pub fn apply_editor(editor_state: &mut EditorState, payload: &OperationPayload) {
    match payload {
        OperationPayload::PinStepOutput { step_id, output_data } => {
            editor_state.pin(step_id.clone(), output_data.clone());
        }
        OperationPayload::UnpinStepOutput { step_id } => {
            editor_state.unpin(step_id);
        }
        OperationPayload::DisableStep { step_id, mode } => {
            editor_state.disable(step_id.clone(), *mode);
        }
        OperationPayload::EnableStep { step_id } => {
            editor_state.enable(step_id);
        }
        _ => {}
    }
}

/// Applies a small JSON-pointer-style patch (`/a/b/0`-shaped paths) to a
/// step's config, in order, against a deep clone of the current value.
fn apply_patch(config: &mut serde_json::Map<String, Value>, patch: &[PatchOp]) -> Result<(), ValidationError> {
    let mut root = Value::Object(config.clone());
    for op in patch {
        match op {
            PatchOp::Add { path, value } | PatchOp::Replace { path, value } => {
                set_at_path(&mut root, path, value.clone())?;
            }
            PatchOp::Remove { path } => {
                remove_at_path(&mut root, path)?;
            }
        }
    }
    *config = match root {
        Value::Object(map) => map,
        _ => unreachable!("root started as an object and only object/array mutations are allowed"),
    };
    Ok(())
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn patch_error(path: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidPatch { step_id: String::new(), reason: format!("{path}: {}", reason.into()) }
}

fn navigate_to_parent<'a>(root: &'a mut Value, segs: &[&str]) -> Result<&'a mut Value, ValidationError> {
    let mut current = root;
    for seg in &segs[..segs.len().saturating_sub(1)] {
        current = match current {
            Value::Object(map) => map
                .get_mut(*seg)
                .ok_or_else(|| patch_error(seg, "no such field"))?,
            Value::Array(arr) => {
                let idx: usize = seg.parse().map_err(|_| patch_error(seg, "not an array index"))?;
                arr.get_mut(idx).ok_or_else(|| patch_error(seg, "index out of bounds"))?
            }
            _ => return Err(patch_error(seg, "cannot descend into a scalar")),
        };
    }
    Ok(current)
}

fn set_at_path(root: &mut Value, path: &str, value: Value) -> Result<(), ValidationError> {
    let segs = segments(path);
    let Some(last) = segs.last().copied() else {
        *root = value;
        return Ok(());
    };
    let parent = navigate_to_parent(root, &segs)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(arr) => {
            if last == "-" {
                arr.push(value);
            } else {
                let idx: usize = last.parse().map_err(|_| patch_error(last, "not an array index"))?;
                if idx > arr.len() {
                    return Err(patch_error(last, "index out of bounds"));
                }
                if idx == arr.len() {
                    arr.push(value);
                } else {
                    arr[idx] = value;
                }
            }
        }
        _ => return Err(patch_error(path, "cannot set a field on a scalar")),
    }
    Ok(())
}

fn remove_at_path(root: &mut Value, path: &str) -> Result<(), ValidationError> {
    let segs = segments(path);
    let Some(last) = segs.last().copied() else {
        return Err(patch_error(path, "cannot remove the root"));
    };
    let parent = navigate_to_parent(root, &segs)?;
    match parent {
        Value::Object(map) => {
            map.remove(last).ok_or_else(|| patch_error(last, "no such field"))?;
        }
        Value::Array(arr) => {
            let idx: usize = last.parse().map_err(|_| patch_error(last, "not an array index"))?;
            if idx >= arr.len() {
                return Err(patch_error(last, "index out of bounds"));
            }
            arr.remove(idx);
        }
        _ => return Err(patch_error(path, "cannot remove a field from a scalar")),
    }
    Ok(())
}
