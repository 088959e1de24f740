use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use wf_contracts::{EditorState, Execution, ExecutionType, TriggerSpec, WorkflowDraft};
use wf_engine::{BufferedEventSink, BufferedHooks, EngineConfig, ExecutionEngine};
use wf_steps::StepRegistry;
use wf_storage::Persistence;

use crate::hooks::CliHooks;
use crate::output::{print_table_header, print_table_row, OutputFormat};
use crate::report::RunReport;

#[derive(Args)]
pub struct RunArgs {
    /// Path to a workflow draft, as the same JSON shape the edit-session
    /// sync protocol carries (`workflow_id`, `steps`, `connections`,
    /// `triggers`, `settings`).
    pub file: PathBuf,

    /// Seed input for the run's trigger steps: a literal JSON value, or
    /// `@path` to read it from a file.
    #[arg(long)]
    pub input: Option<String>,

    /// Restrict the run to these step ids (and their ancestors); omit to
    /// run the whole graph.
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Write the execution and its step executions to this file for later
    /// `wf inspect`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: RunArgs, output: OutputFormat) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file).with_context(|| format!("failed to read {}", args.file.display()))?;
    let draft: WorkflowDraft = serde_json::from_str(&raw).context("failed to parse workflow draft")?;

    let seed_input = match &args.input {
        Some(raw) => parse_seed_input(raw)?,
        None => Value::Null,
    };

    let editor_state = EditorState::new();
    let trigger = TriggerSpec { trigger_type: "manual".into(), data: Value::Null };
    let mut execution = Execution::new(draft.workflow_id.clone(), trigger, ExecutionType::Production);

    println!("Running workflow '{}' (execution {})", draft.workflow_id, execution.id);
    let sink = Arc::new(BufferedEventSink::new());
    let flush_handle = sink.clone().spawn_flush_loop(Duration::from_millis(500));
    let hooks = Arc::new(BufferedHooks::new(CliHooks, sink));
    let engine = ExecutionEngine::with_config(StepRegistry::default(), hooks, EngineConfig::from_env());
    let step_executions = engine.run(&draft, &editor_state, &mut execution, &args.targets, seed_input).await?;
    flush_handle.abort();

    if let Some(database_url) = std::env::var("DATABASE_URL").ok() {
        let pool = sqlx::PgPool::connect(&database_url).await.context("failed to connect to database")?;
        let persistence = wf_storage::PostgresPersistence::new(pool);
        persistence.append_step_executions(&step_executions).await?;
        persistence.update_execution(&execution).await?;
    } else {
        tracing::debug!("DATABASE_URL not set, run is not durably recorded");
    }

    let report = RunReport { execution: execution.clone(), step_executions };
    if let Some(out) = &args.out {
        report.save(out)?;
        println!("Wrote report to {}", out.display());
    }

    print_report(&report, output);
    if execution.status == wf_contracts::ExecutionStatus::Failed {
        anyhow::bail!("execution {} failed", execution.id);
    }
    Ok(())
}

fn parse_seed_input(raw: &str) -> Result<Value> {
    let raw = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&raw).context("failed to parse --input as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_literal_json_value() {
        assert_eq!(parse_seed_input(r#"{"a":1}"#).unwrap(), serde_json::json!({ "a": 1 }));
    }

    #[test]
    fn reads_input_from_a_file_reference() {
        let path = std::env::temp_dir().join("wf-cli-seed-input-test.json");
        std::fs::write(&path, r#"{"x":42}"#).unwrap();
        let value = parse_seed_input(&format!("@{}", path.display())).unwrap();
        assert_eq!(value, serde_json::json!({ "x": 42 }));
        std::fs::remove_file(&path).unwrap();
    }
}

pub fn print_report(report: &RunReport, output: OutputFormat) {
    if !output.is_text() {
        output.print_value(report);
        return;
    }

    println!("\nexecution {} — {:?}", report.execution.id, report.execution.status);
    print_table_header(&[("STEP", 20), ("STATUS", 12), ("DURATION (us)", 14)]);
    for se in &report.step_executions {
        print_table_row(&[
            (se.step_id.as_str(), 20),
            (format!("{:?}", se.status).as_str(), 12),
            (se.duration_us.map(|d| d.to_string()).unwrap_or_default().as_str(), 14),
        ]);
    }
}
