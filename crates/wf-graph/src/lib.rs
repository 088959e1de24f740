//! DAG adjacency, topological sort, and subgraph extraction.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use wf_contracts::{Connection, Step, StepId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle detected")]
    CycleDetected { witness: Vec<StepId> },
}

/// Adjacency representation built from a step list and connection list.
/// Connections whose endpoints are not in the step set are tracked in
/// `invalid_edges` rather than rejected outright — the caller (validation
/// layer) decides whether that's fatal.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<StepId>,
    forward: HashMap<StepId, Vec<StepId>>,
    reverse: HashMap<StepId, Vec<StepId>>,
    pub invalid_edges: Vec<Connection>,
}

impl Graph {
    pub fn build(steps: &[Step], connections: &[Connection]) -> Self {
        let node_set: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        let mut forward: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut reverse: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut invalid_edges = Vec::new();

        for step in steps {
            forward.entry(step.id.clone()).or_default();
            reverse.entry(step.id.clone()).or_default();
        }

        for conn in connections {
            if !node_set.contains(conn.source_step_id.as_str())
                || !node_set.contains(conn.target_step_id.as_str())
            {
                invalid_edges.push(conn.clone());
                continue;
            }
            forward
                .entry(conn.source_step_id.clone())
                .or_default()
                .push(conn.target_step_id.clone());
            reverse
                .entry(conn.target_step_id.clone())
                .or_default()
                .push(conn.source_step_id.clone());
        }

        Self {
            nodes: steps.iter().map(|s| s.id.clone()).collect(),
            forward,
            reverse,
            invalid_edges,
        }
    }

    pub fn nodes(&self) -> &[StepId] {
        &self.nodes
    }

    pub fn children(&self, id: &str) -> &[StepId] {
        self.forward.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn parents(&self, id: &str) -> &[StepId] {
        self.reverse.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Transitive parents of `id`, excluding `id` itself. Order unspecified.
    pub fn upstream(&self, id: &str) -> HashSet<StepId> {
        self.transitive(id, &self.reverse)
    }

    /// Transitive children of `id`, excluding `id` itself. Order unspecified.
    pub fn downstream(&self, id: &str) -> HashSet<StepId> {
        self.transitive(id, &self.forward)
    }

    fn transitive(&self, start: &str, adjacency: &HashMap<StepId, Vec<StepId>>) -> HashSet<StepId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());
        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(&current) {
                for next in neighbors {
                    if seen.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        seen
    }

    /// Would adding `source -> target` create a cycle? (Used by
    /// `add_connection` validation before the edge is actually inserted.)
    pub fn would_cycle(&self, source: &str, target: &str) -> bool {
        if source == target {
            return true;
        }
        // A new edge source->target creates a cycle iff target can already
        // reach source.
        self.downstream(target).contains(source) || target == source
    }

    /// Topological order consistent with edges, or the witness cycle.
    pub fn topological_sort(&self) -> Result<Vec<StepId>, GraphError> {
        let mut color: HashMap<&str, Color> = self.nodes.iter().map(|n| (n.as_str(), Color::White)).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&str> = Vec::new();

        for start in &self.nodes {
            if color[start.as_str()] != Color::White {
                continue;
            }
            if let Some(witness) = self.visit(start, &mut color, &mut stack, &mut order) {
                return Err(GraphError::CycleDetected { witness });
            }
        }

        order.reverse();
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        color: &mut HashMap<&'a str, Color>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<StepId>,
    ) -> Option<Vec<StepId>> {
        color.insert(node, Color::Gray);
        stack.push(node);

        for child in self.children(node) {
            match color.get(child.as_str()).copied() {
                Some(Color::Gray) => {
                    // Back edge found: build the witness cycle from the stack.
                    let start_pos = stack.iter().position(|n| *n == child.as_str()).unwrap_or(0);
                    let mut witness: Vec<StepId> = stack[start_pos..].iter().map(|s| s.to_string()).collect();
                    witness.push(child.clone());
                    return Some(witness);
                }
                Some(Color::Black) | None => {}
                Some(Color::White) => {
                    if let Some(witness) = self.visit(child.as_str(), color, stack, order) {
                        return Some(witness);
                    }
                }
            }
        }

        stack.pop();
        color.insert(node, Color::Black);
        order.push(node.to_string());
        None
    }

    /// Restrict the graph to ancestors of `targets`.
    ///
    /// `exclude` removes the given vertices and their outgoing edges before
    /// ancestry is computed. `include_targets` controls whether a target
    /// vertex is kept in the result when all of its parents were excluded
    /// (i.e. it has become a root of the restricted graph).
    pub fn execution_subgraph(&self, targets: &[StepId], opts: SubgraphOpts) -> Graph {
        let excluded: HashSet<&str> = opts.exclude.iter().map(|s| s.as_str()).collect();

        let mut keep: HashSet<StepId> = HashSet::new();
        let mut queue: VecDeque<StepId> = VecDeque::new();

        for target in targets {
            if excluded.contains(target.as_str()) {
                continue;
            }
            if keep.insert(target.clone()) {
                queue.push_back(target.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            for parent in self.parents(&current) {
                if excluded.contains(parent.as_str()) {
                    continue;
                }
                if keep.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
        }

        if !opts.include_targets {
            for target in targets {
                if self.parents(target).iter().all(|p| excluded.contains(p.as_str())) {
                    keep.remove(target);
                }
            }
        }

        let nodes: Vec<StepId> = self.nodes.iter().filter(|n| keep.contains(n.as_str())).cloned().collect();
        let mut forward: HashMap<StepId, Vec<StepId>> = HashMap::new();
        let mut reverse: HashMap<StepId, Vec<StepId>> = HashMap::new();
        for node in &nodes {
            forward.insert(node.clone(), Vec::new());
            reverse.insert(node.clone(), Vec::new());
        }
        for node in &nodes {
            for child in self.children(node) {
                if keep.contains(child.as_str()) {
                    forward.get_mut(node).unwrap().push(child.clone());
                    reverse.get_mut(child).unwrap().push(node.clone());
                }
            }
        }

        Graph {
            nodes,
            forward,
            reverse,
            invalid_edges: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug, Clone, Default)]
pub struct SubgraphOpts {
    pub exclude: HashSet<StepId>,
    pub include_targets: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_contracts::Connection;

    fn step(id: &str) -> Step {
        Step::new(id, "debug", id)
    }

    #[test]
    fn linear_topological_sort() {
        let steps = vec![step("a"), step("b"), step("c")];
        let conns = vec![Connection::new("c1", "a", "b"), Connection::new("c2", "b", "c")];
        let g = Graph::build(&steps, &conns);
        assert_eq!(g.topological_sort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cycle_is_detected_with_witness() {
        let steps = vec![step("a"), step("b"), step("c")];
        let conns = vec![
            Connection::new("c1", "a", "b"),
            Connection::new("c2", "b", "c"),
            Connection::new("c3", "c", "a"),
        ];
        let g = Graph::build(&steps, &conns);
        let err = g.topological_sort().unwrap_err();
        match err {
            GraphError::CycleDetected { witness } => assert!(witness.len() >= 2),
        }
    }

    #[test]
    fn would_cycle_detects_back_edge() {
        let steps = vec![step("a"), step("b"), step("c")];
        let conns = vec![Connection::new("c1", "a", "b"), Connection::new("c2", "b", "c")];
        let g = Graph::build(&steps, &conns);
        assert!(g.would_cycle("c", "a"));
        assert!(!g.would_cycle("a", "c"));
    }

    #[test]
    fn invalid_edges_are_tracked_not_rejected() {
        let steps = vec![step("a")];
        let conns = vec![Connection::new("c1", "a", "ghost")];
        let g = Graph::build(&steps, &conns);
        assert_eq!(g.invalid_edges.len(), 1);
        assert!(g.children("a").is_empty());
    }

    #[test]
    fn upstream_and_downstream_are_transitive() {
        let steps = vec![step("a"), step("b"), step("c")];
        let conns = vec![Connection::new("c1", "a", "b"), Connection::new("c2", "b", "c")];
        let g = Graph::build(&steps, &conns);
        assert_eq!(g.upstream("c"), ["a", "b"].into_iter().map(String::from).collect());
        assert_eq!(g.downstream("a"), ["b", "c"].into_iter().map(String::from).collect());
    }

    #[test]
    fn execution_subgraph_restricts_to_ancestors_and_honors_exclude() {
        let steps = vec![step("a"), step("b"), step("c"), step("d")];
        let conns = vec![
            Connection::new("c1", "a", "b"),
            Connection::new("c2", "b", "c"),
            Connection::new("c3", "a", "d"),
        ];
        let g = Graph::build(&steps, &conns);
        let sub = g.execution_subgraph(
            &["c".to_string()],
            SubgraphOpts {
                exclude: HashSet::new(),
                include_targets: true,
            },
        );
        let mut nodes = sub.nodes().to_vec();
        nodes.sort();
        assert_eq!(nodes, vec!["a", "b", "c"]);
    }

    #[test]
    fn execution_subgraph_drops_target_without_parents_when_include_targets_false() {
        let steps = vec![step("a"), step("b")];
        let conns = vec![Connection::new("c1", "a", "b")];
        let g = Graph::build(&steps, &conns);
        let sub = g.execution_subgraph(
            &["b".to_string()],
            SubgraphOpts {
                exclude: ["a".to_string()].into_iter().collect(),
                include_targets: false,
            },
        );
        assert!(sub.nodes().is_empty());
    }
}
