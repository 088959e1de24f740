//! Payloads broadcast on `workflow:<id>:ops` and `workflow:<id>:presence`.
//! A `tokio::sync::broadcast` channel fans these out to every subscribed
//! client connection; lagging subscribers drop old events rather than
//! block the session.

use wf_contracts::{EditOperation, PresenceEvent};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    OperationApplied { seq: u64, op: EditOperation },
    Presence(PresenceEvent),
}
