//! Drive phase: walk `Plan::by_level()` and execute one level at a time.
//! Steps within a level are independent by construction (neither is an
//! ancestor of the other), so they run concurrently; the engine only
//! serializes across levels.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};
use wf_contracts::{
    Connection, EditorState, Execution, ExecutionStatus, ExecutorError, Item, StepExecution, StepExecutionStatus,
    Token, WorkflowDraft,
};
use wf_graph::Graph;
use wf_steps::{StepExecutor, StepInput, StepRegistry};

use crate::bind::{build_context, resolve_config};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::observability::EngineHooks;
use crate::plan::Plan;
use crate::resource::{ResourceSampler, ResourceUsage};

pub struct DriveResult {
    pub step_executions: Vec<StepExecution>,
    pub final_status: ExecutionStatus,
}

fn connection_fires(conn: &Connection, token: &Token) -> bool {
    if token.is_skip() {
        return true;
    }
    conn.source_output == "main" || token.route() == Some(conn.source_output.as_str())
}

/// Index connections by target, restricted to the edges the plan kept.
fn incoming_index<'a>(draft: &'a WorkflowDraft, kept: &HashSet<String>) -> HashMap<&'a str, Vec<&'a Connection>> {
    let mut index: HashMap<&str, Vec<&Connection>> = HashMap::new();
    for conn in &draft.connections {
        if kept.contains(conn.source_step_id.as_str()) && kept.contains(conn.target_step_id.as_str()) {
            index.entry(conn.target_step_id.as_str()).or_default().push(conn);
        }
    }
    index
}

/// Index connections by source, restricted to the edges the plan kept.
/// Symmetric to `incoming_index`, used by the routing policy to check
/// whether a failed step has a branch waiting on its error category.
fn outgoing_index<'a>(draft: &'a WorkflowDraft, kept: &HashSet<String>) -> HashMap<&'a str, Vec<&'a Connection>> {
    let mut index: HashMap<&str, Vec<&Connection>> = HashMap::new();
    for conn in &draft.connections {
        if kept.contains(conn.source_step_id.as_str()) && kept.contains(conn.target_step_id.as_str()) {
            index.entry(conn.source_step_id.as_str()).or_default().push(conn);
        }
    }
    index
}

/// A step's error category is a routing label like any other. If a step has
/// an outgoing connection whose `source_output` matches the category, the
/// failure is routable: it propagates as a token instead of cascading
/// cancellation to the rest of the execution.
fn route_error(step_id: &str, error: &ExecutorError, outgoing: &HashMap<&str, Vec<&Connection>>) -> Option<Token> {
    let has_route = outgoing
        .get(step_id)
        .map(|conns| conns.iter().any(|c| c.source_output == error.category))
        .unwrap_or(false);
    has_route.then(|| {
        Token::routed(
            error.category.clone(),
            json!({ "error": { "category": error.category, "message": error.message, "details": error.details } }),
        )
    })
}

/// What a step will run with, decided before the executor call so the whole
/// level can be dispatched concurrently.
enum Intake {
    /// Every fired parent was a skip, or the step has no fired parents.
    Skip,
    /// Pinned in the editor — short-circuits the executor entirely.
    Pinned(Value),
    Run {
        resolved_config: Value,
        input: Value,
    },
    /// The governing token was a fan-out (`Token::Items`) and this step type
    /// runs once per item. An item already carrying an inherited error is
    /// not re-executed — the third tuple element carries it straight
    /// through.
    RunItems {
        per_item: Vec<(Value, Value, Option<ExecutorError>)>,
    },
}

#[allow(clippy::too_many_arguments)]
fn gather_intake(
    step_id: &str,
    type_id: &str,
    draft: &WorkflowDraft,
    editor_state: &EditorState,
    graph: &Graph,
    incoming: &HashMap<&str, Vec<&Connection>>,
    tokens: &HashMap<String, Token>,
    outputs: &HashMap<String, Value>,
    execution: &Execution,
    seed_token: &Token,
    has_parents: bool,
) -> Result<Intake, EngineError> {
    if let Some(pinned) = editor_state.pinned_outputs.get(step_id) {
        return Ok(Intake::Pinned(pinned.clone()));
    }

    let incoming_conns = incoming.get(step_id).cloned().unwrap_or_default();

    let fired: Vec<(&str, &Token)> = if !has_parents {
        vec![("__seed__", seed_token)]
    } else {
        incoming_conns
            .iter()
            .filter_map(|conn| {
                tokens
                    .get(conn.source_step_id.as_str())
                    .filter(|t| connection_fires(conn, t))
                    .map(|t| (conn.source_step_id.as_str(), t))
            })
            .collect()
    };

    let data_fired: Vec<(&str, &Token)> = fired.iter().filter(|(_, t)| !t.is_skip()).copied().collect();
    if data_fired.is_empty() {
        return Ok(Intake::Skip);
    }

    let step = draft.step(step_id).expect("plan only contains draft steps");
    let upstream = graph.upstream(step_id);

    if type_id == "merge" {
        let mode = step.config.get("mode").and_then(Value::as_str).unwrap_or("combine");
        let any_parent_skipped = fired.iter().any(|(_, t)| t.is_skip());

        if mode == "wait_all" && (any_parent_skipped || fired.len() < incoming_conns.len()) {
            return Ok(Intake::Skip);
        }

        let considered: Vec<(&str, &Token)> = if mode == "wait_any" {
            data_fired.first().copied().into_iter().collect()
        } else {
            data_fired
        };

        let parents: Vec<Value> = considered
            .iter()
            .map(|(id, t)| json!({ "source_step_id": id, "value": t.as_json() }))
            .collect();
        let context = build_context(step, &Token::data(Value::Array(parents.clone())), &upstream, outputs, draft, execution);
        let resolved_config = resolve_config(step, &context)?;
        return Ok(Intake::Run {
            resolved_config,
            input: Value::Array(parents),
        });
    }

    let (_, token) = data_fired[0];

    // `aggregate` resumes scalar mode: a fan-out token folds into a single
    // array-shaped input, not a per-item run.
    if type_id == "aggregate" {
        if let Token::Items { items, .. } = token {
            let wrapped: Vec<Value> = items
                .iter()
                .map(|item| {
                    let error_json = item.error.as_ref().map(|e| json!(e)).unwrap_or(Value::Null);
                    json!({ "value": item.value.clone(), "error": error_json })
                })
                .collect();
            let input_value = Value::Array(wrapped);
            let context = build_context(step, &Token::data(input_value.clone()), &upstream, outputs, draft, execution);
            let resolved_config = resolve_config(step, &context)?;
            return Ok(Intake::Run {
                resolved_config,
                input: input_value,
            });
        }
    }

    if let Token::Items { items, .. } = token {
        let mut per_item = Vec::with_capacity(items.len());
        for item in items {
            if let Some(err) = &item.error {
                per_item.push((Value::Null, item.value.clone(), Some(err.clone())));
                continue;
            }
            let item_token = Token::data(item.value.clone());
            let context = build_context(step, &item_token, &upstream, outputs, draft, execution);
            let resolved_config = resolve_config(step, &context)?;
            per_item.push((resolved_config, item.value.clone(), None));
        }
        return Ok(Intake::RunItems { per_item });
    }

    let context = build_context(step, token, &upstream, outputs, draft, execution);
    let resolved_config = resolve_config(step, &context)?;
    Ok(Intake::Run {
        resolved_config,
        input: token.as_json(),
    })
}

/// Turns an executor's raw JSON result into the token that propagates to
/// children and the value exposed under `nodes.<step_id>`.
fn interpret_result(type_id: &str, result: Value) -> (Token, Value) {
    match type_id {
        "branch" | "switch" => {
            let route = result.get("route").and_then(Value::as_str).unwrap_or("default").to_string();
            let value = result.get("value").cloned().unwrap_or(Value::Null);
            (Token::routed(route, value.clone()), value)
        }
        "split" => {
            let items = result.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
            let token_items: Vec<Item> = items.iter().enumerate().map(|(i, v)| Item::new(i, v.clone())).collect();
            (Token::items(token_items), Value::Array(items))
        }
        "merge" | "aggregate" | "math" | "string_ops" | "json_parser" | "format_string" => {
            let value = result.get("value").cloned().unwrap_or(Value::Null);
            (Token::data(value.clone()), value)
        }
        _ => (Token::data(result.clone()), result),
    }
}

enum LeveledOutcome {
    Skip,
    Pinned(Value),
    Bind(EngineError),
    Run {
        type_id: String,
        resolved_config: Value,
        input: Value,
        executor: Option<Arc<dyn StepExecutor>>,
    },
    RunItems {
        type_id: String,
        per_item: Vec<(Value, Value, Option<ExecutorError>)>,
        executor: Option<Arc<dyn StepExecutor>>,
    },
}

pub struct Driver {
    pub registry: Arc<StepRegistry>,
    pub hooks: Arc<dyn EngineHooks>,
    pub config: EngineConfig,
    pub resources: Arc<ResourceSampler>,
}

impl Driver {
    pub fn new(registry: Arc<StepRegistry>, hooks: Arc<dyn EngineHooks>) -> Self {
        Self::with_config(registry, hooks, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<StepRegistry>, hooks: Arc<dyn EngineHooks>, config: EngineConfig) -> Self {
        Self {
            registry,
            hooks,
            config,
            resources: Arc::new(ResourceSampler::new()),
        }
    }

    /// Snapshots resource usage for this driver under the given scope label
    /// (e.g. a session or execution id).
    pub fn resource_usage(&self, scope: impl Into<String>) -> ResourceUsage {
        self.resources.sample(scope)
    }

    pub async fn drive(
        &self,
        plan: &Plan,
        draft: &WorkflowDraft,
        editor_state: &EditorState,
        execution: &mut Execution,
        seed_input: Value,
    ) -> DriveResult {
        execution.mark_running();

        let kept: HashSet<String> = plan.graph.nodes().iter().cloned().collect();
        let incoming = incoming_index(draft, &kept);
        let outgoing = outgoing_index(draft, &kept);
        let seed_token = Token::data(seed_input);

        let mut tokens: HashMap<String, Token> = HashMap::new();
        let mut outputs: HashMap<String, Value> = HashMap::new();
        let mut step_executions: Vec<StepExecution> = Vec::new();
        let mut failed = false;

        for level in plan.by_level() {
            if failed {
                for step_id in &level {
                    let mut se = StepExecution::pending(execution.id, step_id.clone());
                    se.cancel();
                    step_executions.push(se);
                }
                continue;
            }

            self.resources.record_queue_length(level.len());

            let mut outcomes = Vec::with_capacity(level.len());
            for step_id in &level {
                let Some(step) = draft.step(step_id) else { continue };
                let has_parents = !plan.graph.parents(step_id).is_empty();

                if plan.skipped.contains(step_id) {
                    outcomes.push((step_id.clone(), LeveledOutcome::Skip));
                    continue;
                }

                let intake = gather_intake(
                    step_id,
                    &step.type_id,
                    draft,
                    editor_state,
                    &plan.graph,
                    &incoming,
                    &tokens,
                    &outputs,
                    execution,
                    &seed_token,
                    has_parents,
                );

                match intake {
                    Err(e) => outcomes.push((step_id.clone(), LeveledOutcome::Bind(e))),
                    Ok(Intake::Skip) => outcomes.push((step_id.clone(), LeveledOutcome::Skip)),
                    Ok(Intake::Pinned(value)) => outcomes.push((step_id.clone(), LeveledOutcome::Pinned(value))),
                    Ok(Intake::Run { resolved_config, input }) => {
                        let executor = self.registry.executor(&step.type_id);
                        outcomes.push((
                            step_id.clone(),
                            LeveledOutcome::Run {
                                type_id: step.type_id.clone(),
                                resolved_config,
                                input,
                                executor,
                            },
                        ));
                    }
                    Ok(Intake::RunItems { per_item }) => {
                        let executor = self.registry.executor(&step.type_id);
                        outcomes.push((
                            step_id.clone(),
                            LeveledOutcome::RunItems {
                                type_id: step.type_id.clone(),
                                per_item,
                                executor,
                            },
                        ));
                    }
                }
            }

            let futures = outcomes
                .into_iter()
                .map(|(step_id, outcome)| self.run_one(execution, &outgoing, step_id, outcome));
            let results = futures::future::join_all(futures).await;

            for (step_id, executions, token, output, hard_failed) in results {
                if hard_failed {
                    failed = true;
                }
                if let Some(token) = token {
                    tokens.insert(step_id.clone(), token);
                }
                if let Some(output) = output {
                    outputs.insert(step_id, output);
                }
                step_executions.extend(executions);
            }
        }

        let final_status = if failed { ExecutionStatus::Failed } else { ExecutionStatus::Completed };
        execution.mark_terminal(final_status);

        DriveResult {
            step_executions,
            final_status,
        }
    }

    /// Runs one registered executor call under the step timeout. On a
    /// domain error, consults the routing policy: a matching downstream
    /// route turns the failure into a routed token instead of a cascading
    /// one (the `StepExecution` is still honestly recorded as failed).
    async fn execute_step(
        &self,
        execution_id: uuid::Uuid,
        step_id: &str,
        type_id: &str,
        resolved_config: Value,
        input: Value,
        executor: &Option<Arc<dyn StepExecutor>>,
        outgoing: &HashMap<&str, Vec<&Connection>>,
    ) -> (StepExecution, Option<Token>, Option<Value>, bool) {
        let mut se = StepExecution::pending(execution_id, step_id.to_string());
        se.resolved_config = resolved_config.clone();
        se.input = input.clone();
        self.hooks.before_step(execution_id, step_id);
        se.start();
        self.resources.record_step();

        let Some(executor) = executor else {
            let err = ExecutorError::new("fatal_error", format!("no executor registered for step type '{type_id}'"));
            let routed = route_error(step_id, &err, outgoing);
            let hard_failed = routed.is_none();
            se.fail(err);
            self.hooks.after_step(execution_id, &se);
            return (se, routed, None, hard_failed);
        };

        let call = executor.execute(StepInput { resolved_config, input });
        match tokio::time::timeout(self.config.step_timeout, call).await {
            Ok(Ok(result)) => {
                let (token, output) = interpret_result(type_id, result);
                se.complete(output.clone());
                self.hooks.after_step(execution_id, &se);
                (se, Some(token), Some(output), false)
            }
            Ok(Err(e)) => {
                let routed = route_error(step_id, &e, outgoing);
                let hard_failed = routed.is_none();
                se.fail(e);
                self.hooks.after_step(execution_id, &se);
                (se, routed, None, hard_failed)
            }
            Err(_elapsed) => {
                let err = ExecutorError::new("timeout", format!("step '{step_id}' exceeded {:?}", self.config.step_timeout));
                let routed = route_error(step_id, &err, outgoing);
                let hard_failed = routed.is_none();
                se.fail(err);
                self.hooks.after_step(execution_id, &se);
                (se, routed, None, hard_failed)
            }
        }
    }

    async fn run_one(
        &self,
        execution: &Execution,
        outgoing: &HashMap<&str, Vec<&Connection>>,
        step_id: String,
        outcome: LeveledOutcome,
    ) -> (String, Vec<StepExecution>, Option<Token>, Option<Value>, bool) {
        match outcome {
            LeveledOutcome::Skip => {
                let mut se = StepExecution::pending(execution.id, step_id.clone());
                se.skip();
                (step_id.clone(), vec![se], Some(Token::skip(step_id)), None, false)
            }
            LeveledOutcome::Pinned(value) => {
                let mut se = StepExecution::pending(execution.id, step_id.clone());
                se.complete(value.clone());
                (step_id, vec![se], Some(Token::data(value.clone())), Some(value), false)
            }
            LeveledOutcome::Bind(e) => {
                let mut se = StepExecution::pending(execution.id, step_id.clone());
                se.fail(e.as_executor_error());
                (step_id, vec![se], None, None, true)
            }
            LeveledOutcome::Run { type_id, resolved_config, input, executor } => {
                let (se, token, output, hard_failed) = self
                    .execute_step(execution.id, &step_id, &type_id, resolved_config, input, &executor, outgoing)
                    .await;
                (step_id, vec![se], token, output, hard_failed)
            }
            LeveledOutcome::RunItems { type_id, per_item, executor } => {
                let total = per_item.len();
                let calls = per_item.into_iter().enumerate().map(|(index, (resolved_config, input, inherited_error))| {
                    let type_id = type_id.clone();
                    let executor = executor.clone();
                    let step_id = step_id.clone();
                    async move {
                        if let Some(err) = inherited_error {
                            let mut se = StepExecution::pending(execution.id, step_id);
                            se.item = Some((index, total));
                            se.fail(err.clone());
                            (se, Item { index, value: Value::Null, error: Some(err) })
                        } else {
                            let (mut se, _token, output, _hard_failed) = self
                                .execute_step(execution.id, &step_id, &type_id, resolved_config, input, &executor, outgoing)
                                .await;
                            se.item = Some((index, total));
                            match output {
                                Some(value) => (se, Item { index, value, error: None }),
                                None => {
                                    let error = se.error.clone().unwrap_or_else(|| {
                                        ExecutorError::new("fatal_error", "item execution produced no output")
                                    });
                                    (se, Item { index, value: Value::Null, error: Some(error) })
                                }
                            }
                        }
                    }
                });

                let results = futures::future::join_all(calls).await;
                let mut step_executions = Vec::with_capacity(results.len());
                let mut items = Vec::with_capacity(results.len());
                for (se, item) in results {
                    step_executions.push(se);
                    items.push(item);
                }

                // Item-level failures are recorded honestly per item but
                // never cascade-cancel the rest of the execution — only the
                // aggregator downstream decides how to treat them.
                let output_array = Value::Array(items.iter().map(|i| i.value.clone()).collect());
                let token = Token::items(items);
                (step_id, step_executions, Some(token), Some(output_array), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_contracts::{ExecutionType, Step, TriggerSpec};

    fn step(id: &str, type_id: &str) -> Step {
        Step::new(id, type_id, id)
    }

    fn execution() -> Execution {
        Execution::new(
            "wf-1".into(),
            TriggerSpec {
                trigger_type: "manual".into(),
                data: json!({}),
            },
            ExecutionType::Production,
        )
    }

    fn driver() -> Driver {
        Driver::new(Arc::new(StepRegistry::default()), Arc::new(crate::observability::TracingHooks))
    }

    #[tokio::test]
    async fn linear_pipeline_runs_in_order() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("a", "debug"), step("b", "debug")];
        draft.connections = vec![Connection::new("c1", "a", "b")];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!({ "n": 1 })).await;

        assert_eq!(result.final_status, ExecutionStatus::Completed);
        assert_eq!(result.step_executions.len(), 2);
        let b = result.step_executions.iter().find(|se| se.step_id == "b").unwrap();
        assert_eq!(b.output, json!({ "n": 1 }));
    }

    #[tokio::test]
    async fn branch_skips_the_untaken_path() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("a", "branch"), step("t", "debug"), step("f", "debug")];
        draft.step_mut("a").unwrap().config = serde_json::from_value(json!({ "condition": true })).unwrap();
        draft.connections = vec![
            Connection {
                id: "c1".into(),
                source_step_id: "a".into(),
                source_output: "true".into(),
                target_step_id: "t".into(),
                target_input: "main".into(),
            },
            Connection {
                id: "c2".into(),
                source_step_id: "a".into(),
                source_output: "false".into(),
                target_step_id: "f".into(),
                target_input: "main".into(),
            },
        ];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!({ "status": 500 })).await;

        let f = result.step_executions.iter().find(|se| se.step_id == "f").unwrap();
        assert_eq!(f.status, StepExecutionStatus::Skipped);
        let t = result.step_executions.iter().find(|se| se.step_id == "t").unwrap();
        assert_eq!(t.status, StepExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn executor_failure_cancels_downstream_steps() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("a", "split"), step("b", "debug")];
        draft.step_mut("a").unwrap().config = serde_json::from_value(json!({ "field": "not-an-array" })).unwrap();
        draft.connections = vec![Connection::new("c1", "a", "b")];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!({})).await;

        assert_eq!(result.final_status, ExecutionStatus::Failed);
        let b = result.step_executions.iter().find(|se| se.step_id == "b").unwrap();
        assert_eq!(b.status, StepExecutionStatus::Cancelled);
    }

    #[tokio::test]
    async fn pinned_output_short_circuits_the_executor() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("a", "debug")];
        let mut editor_state = EditorState::new();
        editor_state.pin("a".into(), json!("pinned-value"));
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver()
            .drive(&plan, &draft, &editor_state, &mut execution, json!({ "ignored": true }))
            .await;

        let a = result.step_executions.iter().find(|se| se.step_id == "a").unwrap();
        assert_eq!(a.output, json!("pinned-value"));
        assert!(a.started_at.is_none());
    }

    #[tokio::test]
    async fn merge_joins_two_branches() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("l", "debug"), step("r", "debug"), step("m", "merge")];
        draft.step_mut("m").unwrap().config = serde_json::from_value(json!({ "combine_strategy": "append" })).unwrap();
        draft.connections = vec![Connection::new("c1", "l", "m"), Connection::new("c2", "r", "m")];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!(1)).await;

        let m = result.step_executions.iter().find(|se| se.step_id == "m").unwrap();
        assert_eq!(m.status, StepExecutionStatus::Completed);
        assert_eq!(m.output, json!([1, 1]));
    }

    #[tokio::test]
    async fn merge_wait_all_skips_when_any_parent_is_skipped() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("a", "branch"), step("t", "debug"), step("f", "debug"), step("m", "merge")];
        draft.step_mut("a").unwrap().config = serde_json::from_value(json!({ "condition": true })).unwrap();
        draft.step_mut("m").unwrap().config =
            serde_json::from_value(json!({ "mode": "wait_all", "combine_strategy": "append" })).unwrap();
        draft.connections = vec![
            Connection {
                id: "c1".into(),
                source_step_id: "a".into(),
                source_output: "true".into(),
                target_step_id: "t".into(),
                target_input: "main".into(),
            },
            Connection {
                id: "c2".into(),
                source_step_id: "a".into(),
                source_output: "false".into(),
                target_step_id: "f".into(),
                target_input: "main".into(),
            },
            Connection::new("c3", "t", "m"),
            Connection::new("c4", "f", "m"),
        ];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!(1)).await;

        let m = result.step_executions.iter().find(|se| se.step_id == "m").unwrap();
        assert_eq!(m.status, StepExecutionStatus::Skipped);
    }

    #[tokio::test]
    async fn merge_wait_any_uses_first_available_parent_only() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("l", "debug"), step("r", "debug"), step("m", "merge")];
        draft.step_mut("m").unwrap().config =
            serde_json::from_value(json!({ "mode": "wait_any", "combine_strategy": "append" })).unwrap();
        draft.connections = vec![Connection::new("c1", "l", "m"), Connection::new("c2", "r", "m")];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!(9)).await;

        let m = result.step_executions.iter().find(|se| se.step_id == "m").unwrap();
        assert_eq!(m.output, json!([9]));
    }

    #[tokio::test]
    async fn split_fans_out_one_step_execution_per_item_and_aggregate_resumes_scalar_mode() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("s", "split"), step("p", "pick"), step("g", "aggregate")];
        draft.step_mut("s").unwrap().config = serde_json::from_value(json!({ "field": "{{ json.users }}" })).unwrap();
        draft.step_mut("p").unwrap().config = serde_json::from_value(json!({ "fields": ["name"] })).unwrap();
        draft.step_mut("g").unwrap().config = serde_json::from_value(json!({ "mode": "array" })).unwrap();
        draft.connections = vec![Connection::new("c1", "s", "p"), Connection::new("c2", "p", "g")];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let seed = json!({ "users": [{"name": "a", "age": 1}, {"name": "b", "age": 2}] });
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, seed).await;

        assert_eq!(result.final_status, ExecutionStatus::Completed);
        let pick_executions: Vec<_> = result.step_executions.iter().filter(|se| se.step_id == "p").collect();
        assert_eq!(pick_executions.len(), 2);
        assert!(pick_executions.iter().any(|se| se.item == Some((0, 2))));
        assert!(pick_executions.iter().any(|se| se.item == Some((1, 2))));

        let g = result.step_executions.iter().find(|se| se.step_id == "g").unwrap();
        assert_eq!(g.output, json!([{"name": "a"}, {"name": "b"}]));
    }

    #[tokio::test]
    async fn routable_error_does_not_cascade_when_a_matching_branch_exists() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps = vec![step("s", "split"), step("ok", "debug")];
        draft.step_mut("s").unwrap().config = serde_json::from_value(json!({ "field": "not-an-array" })).unwrap();
        draft.connections = vec![Connection {
            id: "c1".into(),
            source_step_id: "s".into(),
            source_output: "validation_error".into(),
            target_step_id: "ok".into(),
            target_input: "main".into(),
        }];
        let editor_state = EditorState::new();
        let plan = Plan::build(&draft, &editor_state, &[]).unwrap();

        let mut execution = execution();
        let result = driver().drive(&plan, &draft, &editor_state, &mut execution, json!({})).await;

        assert_eq!(result.final_status, ExecutionStatus::Completed);
        let s = result.step_executions.iter().find(|se| se.step_id == "s").unwrap();
        assert_eq!(s.status, StepExecutionStatus::Failed);
        let ok = result.step_executions.iter().find(|se| se.step_id == "ok").unwrap();
        assert_eq!(ok.status, StepExecutionStatus::Completed);
    }
}
