//! Hooks that tail a run to stdout as it happens, reporting the same
//! shape/size summary a broadcast subscriber would see rather than raw
//! payloads (`SanitizedEvent`, shared with the session's event topics).

use wf_contracts::StepExecution;
use wf_engine::{EngineHooks, SanitizedEvent};

pub struct CliHooks;

impl EngineHooks for CliHooks {
    fn before_step(&self, _execution_id: uuid::Uuid, step_id: &str) {
        println!("  -> {step_id} starting");
    }

    fn after_step(&self, _execution_id: uuid::Uuid, step_execution: &StepExecution) {
        let event = SanitizedEvent::from_step_execution(step_execution);
        println!(
            "  <- {} {} ({} bytes in, {} items out)",
            event.step_id, event.status, event.input_bytes, event.output_item_count,
        );
    }
}
