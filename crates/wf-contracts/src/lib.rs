//! Shared data model and error taxonomy for the collaborative workflow
//! edit-session and execution core.
//!
//! This crate has no opinion on transport, storage backend, or template
//! evaluation — it is the vocabulary every other crate in the workspace
//! speaks, kept separate so it can be depended on without pulling in
//! execution or persistence logic.

pub mod draft;
pub mod editor_state;
pub mod error;
pub mod execution;
pub mod ids;
pub mod operation;
pub mod presence;
pub mod step;
pub mod step_execution;
pub mod sync;
pub mod token;
pub mod version;

pub use draft::WorkflowDraft;
pub use editor_state::EditorState;
pub use error::{ConcurrencyError, ExecutorError, ExpressionError, FatalError, ValidationError};
pub use execution::{Execution, ExecutionStatus, ExecutionType, TriggerSpec};
pub use ids::{ConnectionId, ExecutionId, OperationId, StepExecutionId, StepId, UserId, VersionTag, WorkflowId};
pub use operation::{DisableMode, EditOperation, OperationOutcome, OperationPayload, PatchOp, StepMetadataChanges};
pub use presence::{CursorPosition, PresenceEvent, PresenceUpdate, UserPresence};
pub use step::{Connection, Position, Step};
pub use step_execution::{StepExecution, StepExecutionStatus};
pub use sync::SyncResponse;
pub use token::{Item, Token};
pub use version::WorkflowVersion;
