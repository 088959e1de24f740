//! The step type catalog and its built-in executors.
//!
//! Every executor implements the same golden rule: it consumes only
//! `resolved_config` (already templated by the engine before the step is
//! bound), never the raw upstream token — the documented exceptions are
//! trigger steps, `passthrough`, and `aggregate`, which legitimately need
//! the raw collected input.

mod builtins;
mod registry;
mod truthy;

pub use registry::{StepExecutor, StepInput, StepKind, StepRegistry, StepResult, StepTypeInfo};
pub use truthy::is_truthy;
