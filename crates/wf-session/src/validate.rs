//! Structural operations are validated against the current draft before
//! they're allowed to apply — existence, uniqueness, acyclicity,
//! self-loops, registry membership. Editor operations (pin/unpin,
//! enable/disable) validate minimally, per the operation vocabulary.

use wf_contracts::{OperationPayload, ValidationError, WorkflowDraft};
use wf_steps::StepRegistry;

pub fn validate(draft: &WorkflowDraft, registry: &StepRegistry, payload: &OperationPayload) -> Result<(), ValidationError> {
    match payload {
        OperationPayload::AddStep { step } => {
            if draft.has_step(&step.id) {
                return Err(ValidationError::StepAlreadyExists { step_id: step.id.clone() });
            }
            if !registry.is_known(&step.type_id) {
                return Err(ValidationError::InvalidStepType { type_id: step.type_id.clone() });
            }
            Ok(())
        }
        OperationPayload::RemoveStep { step_id } => require_step(draft, step_id),
        OperationPayload::UpdateStepConfig { step_id, .. } => require_step(draft, step_id),
        OperationPayload::UpdateStepPosition { step_id, .. } => require_step(draft, step_id),
        OperationPayload::UpdateStepMetadata { step_id, .. } => require_step(draft, step_id),
        OperationPayload::AddConnection { connection } => validate_add_connection(draft, connection),
        OperationPayload::RemoveConnection { connection_id } => {
            if draft.connection(connection_id).is_none() {
                return Err(ValidationError::ConnectionNotFound { connection_id: connection_id.clone() });
            }
            Ok(())
        }
        OperationPayload::PinStepOutput { .. }
        | OperationPayload::UnpinStepOutput { .. }
        | OperationPayload::DisableStep { .. }
        | OperationPayload::EnableStep { .. } => Ok(()),
    }
}

fn require_step(draft: &WorkflowDraft, step_id: &str) -> Result<(), ValidationError> {
    if draft.has_step(step_id) {
        Ok(())
    } else {
        Err(ValidationError::StepNotFound { step_id: step_id.to_string() })
    }
}

fn validate_add_connection(draft: &WorkflowDraft, connection: &wf_contracts::Connection) -> Result<(), ValidationError> {
    if draft.connection(&connection.id).is_some() {
        return Err(ValidationError::ConnectionAlreadyExists { connection_id: connection.id.clone() });
    }
    if !draft.has_step(&connection.source_step_id) {
        return Err(ValidationError::SourceStepNotFound { step_id: connection.source_step_id.clone() });
    }
    if !draft.has_step(&connection.target_step_id) {
        return Err(ValidationError::TargetStepNotFound { step_id: connection.target_step_id.clone() });
    }
    if connection.is_self_loop() {
        return Err(ValidationError::SelfLoopNotAllowed { step_id: connection.source_step_id.clone() });
    }

    let graph = wf_graph::Graph::build(&draft.steps, &draft.connections);
    if graph.would_cycle(&connection.source_step_id, &connection.target_step_id) {
        let witness = cycle_witness(&graph, &connection.source_step_id, &connection.target_step_id);
        return Err(ValidationError::WouldCreateCycle { witness });
    }
    Ok(())
}

/// BFS from `target` back to `source` along existing forward edges — the
/// path that would close the loop once `source -> target` is added.
fn cycle_witness(graph: &wf_graph::Graph, source: &str, target: &str) -> Vec<String> {
    use std::collections::{HashMap, VecDeque};

    let mut parent: HashMap<String, String> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(target.to_string());
    let mut visited = std::collections::HashSet::new();
    visited.insert(target.to_string());

    while let Some(current) = queue.pop_front() {
        if current == source {
            let mut path = vec![current.clone()];
            let mut cursor = current;
            while let Some(p) = parent.get(&cursor) {
                path.push(p.clone());
                cursor = p.clone();
            }
            path.reverse();
            path.push(source.to_string());
            return path;
        }
        for child in graph.children(&current) {
            if visited.insert(child.clone()) {
                parent.insert(child.clone(), current.clone());
                queue.push_back(child.clone());
            }
        }
    }
    vec![source.to_string(), target.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_contracts::{Connection, Step};

    fn registry() -> StepRegistry {
        StepRegistry::default()
    }

    #[test]
    fn add_step_rejects_duplicate_id() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps.push(Step::new("a", "debug", "A"));
        let err = validate(&draft, &registry(), &OperationPayload::AddStep { step: Step::new("a", "debug", "A2") })
            .unwrap_err();
        assert_eq!(err, ValidationError::StepAlreadyExists { step_id: "a".into() });
    }

    #[test]
    fn add_step_rejects_unknown_type() {
        let draft = WorkflowDraft::new("wf-1");
        let err = validate(
            &draft,
            &registry(),
            &OperationPayload::AddStep { step: Step::new("a", "not_a_type", "A") },
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidStepType { type_id: "not_a_type".into() });
    }

    #[test]
    fn add_connection_rejects_self_loop() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps.push(Step::new("a", "debug", "A"));
        let err = validate(
            &draft,
            &registry(),
            &OperationPayload::AddConnection { connection: Connection::new("c1", "a", "a") },
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::SelfLoopNotAllowed { step_id: "a".into() });
    }

    #[test]
    fn add_connection_rejects_cycle_with_nonempty_witness() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps.push(Step::new("a", "debug", "A"));
        draft.steps.push(Step::new("b", "debug", "B"));
        draft.connections.push(Connection::new("c1", "a", "b"));
        let err = validate(
            &draft,
            &registry(),
            &OperationPayload::AddConnection { connection: Connection::new("c2", "b", "a") },
        )
        .unwrap_err();
        match err {
            ValidationError::WouldCreateCycle { witness } => assert!(witness.len() >= 2),
            other => panic!("expected would_create_cycle, got {other:?}"),
        }
    }

    #[test]
    fn remove_step_requires_existence() {
        let draft = WorkflowDraft::new("wf-1");
        let err = validate(&draft, &registry(), &OperationPayload::RemoveStep { step_id: "ghost".into() }).unwrap_err();
        assert_eq!(err, ValidationError::StepNotFound { step_id: "ghost".into() });
    }

    #[test]
    fn pin_step_output_is_always_accepted() {
        let draft = WorkflowDraft::new("wf-1");
        assert!(validate(
            &draft,
            &registry(),
            &OperationPayload::PinStepOutput { step_id: "ghost".into(), output_data: serde_json::Value::Null }
        )
        .is_ok());
    }
}
