//! Plan phase: restrict the draft's graph to what this execution will
//! actually run, and assign each surviving step a topological level so
//! same-level steps can be driven concurrently.

use std::collections::{HashMap, HashSet};

use wf_contracts::{DisableMode, EditorState, FatalError, WorkflowDraft};
use wf_graph::{Graph, SubgraphOpts};

#[derive(Debug, Clone)]
pub struct Plan {
    pub graph: Graph,
    pub order: Vec<String>,
    pub levels: HashMap<String, usize>,
    /// Steps disabled in `skip` mode — kept in the graph, but the driver
    /// short-circuits them with a `Token::Skip` instead of executing.
    pub skipped: HashSet<String>,
}

impl Plan {
    pub fn build(draft: &WorkflowDraft, editor_state: &EditorState, targets: &[String]) -> Result<Plan, FatalError> {
        let exclude: HashSet<String> = editor_state
            .disabled_steps
            .iter()
            .filter(|(_, mode)| **mode == DisableMode::Exclude)
            .map(|(id, _)| id.clone())
            .collect();
        let skipped: HashSet<String> = editor_state
            .disabled_steps
            .iter()
            .filter(|(_, mode)| **mode == DisableMode::Skip)
            .map(|(id, _)| id.clone())
            .collect();

        let full = Graph::build(&draft.steps, &draft.connections);

        let graph = if targets.is_empty() {
            full.execution_subgraph(
                &full.nodes().to_vec(),
                SubgraphOpts {
                    exclude,
                    include_targets: true,
                },
            )
        } else {
            full.execution_subgraph(
                targets,
                SubgraphOpts {
                    exclude,
                    include_targets: true,
                },
            )
        };

        let order = graph.topological_sort().map_err(|e| FatalError::CycleDetected { witness: e_witness(e) })?;
        let levels = compute_levels(&graph, &order);

        Ok(Plan {
            graph,
            order,
            levels,
            skipped,
        })
    }

    /// Steps grouped by level, in ascending level order — the driver runs
    /// each group concurrently before moving to the next.
    pub fn by_level(&self) -> Vec<Vec<String>> {
        let max_level = self.levels.values().copied().max().unwrap_or(0);
        let mut groups = vec![Vec::new(); max_level + 1];
        for step_id in &self.order {
            let level = self.levels[step_id];
            groups[level].push(step_id.clone());
        }
        groups
    }
}

fn e_witness(e: wf_graph::GraphError) -> Vec<String> {
    match e {
        wf_graph::GraphError::CycleDetected { witness } => witness,
    }
}

fn compute_levels(graph: &Graph, order: &[String]) -> HashMap<String, usize> {
    let mut levels = HashMap::with_capacity(order.len());
    for step_id in order {
        let level = graph
            .parents(step_id)
            .iter()
            .filter_map(|p| levels.get(p.as_str()).copied())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        levels.insert(step_id.clone(), level);
    }
    levels
}
