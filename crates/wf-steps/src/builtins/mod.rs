pub mod aggregate;
pub mod branch;
pub mod debug;
pub mod format_string;
pub mod http;
pub mod json_parser;
pub mod math;
pub mod merge;
pub mod split;
pub mod string_ops;
pub mod transform;
pub mod triggers;

use std::sync::Arc;

use crate::registry::{StepKind, StepRegistry, StepTypeInfo};

pub(crate) fn register_all(registry: &mut StepRegistry) {
    registry.register(
        StepTypeInfo {
            type_id: "manual_input",
            name: "Manual Input",
            category: "Triggers",
            description: "Starts an execution from an explicitly supplied payload",
            icon: "play",
            kind: StepKind::Trigger,
        },
        Arc::new(triggers::ManualInputExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "webhook",
            name: "Webhook",
            category: "Triggers",
            description: "Starts an execution from an inbound HTTP request",
            icon: "webhook",
            kind: StepKind::Trigger,
        },
        Arc::new(triggers::WebhookExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "schedule",
            name: "Schedule",
            category: "Triggers",
            description: "Starts an execution on a cron schedule (requires an external scheduler)",
            icon: "clock",
            kind: StepKind::Trigger,
        },
        Arc::new(triggers::ScheduleExecutor),
    );

    registry.register(
        StepTypeInfo {
            type_id: "http_request",
            name: "HTTP Request",
            category: "Actions",
            description: "Sends an HTTP request and captures the response",
            icon: "globe",
            kind: StepKind::Action,
        },
        Arc::new(http::HttpRequestExecutor::new()),
    );

    registry.register(
        StepTypeInfo {
            type_id: "branch",
            name: "Branch",
            category: "Control Flow",
            description: "Routes to one of two outputs based on a condition",
            icon: "git-branch",
            kind: StepKind::ControlFlow,
        },
        Arc::new(branch::BranchExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "switch",
            name: "Switch",
            category: "Control Flow",
            description: "Routes to the first matching case, or a default",
            icon: "shuffle",
            kind: StepKind::ControlFlow,
        },
        Arc::new(branch::SwitchExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "merge",
            name: "Merge",
            category: "Control Flow",
            description: "Joins parallel branches back into one token",
            icon: "git-merge",
            kind: StepKind::ControlFlow,
        },
        Arc::new(merge::MergeExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "split",
            name: "Split",
            category: "Control Flow",
            description: "Fans a list out into one execution per item",
            icon: "split",
            kind: StepKind::ControlFlow,
        },
        Arc::new(split::SplitExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "aggregate",
            name: "Aggregate",
            category: "Control Flow",
            description: "Folds a fanned-out set of item executions back into one value",
            icon: "layers",
            kind: StepKind::ControlFlow,
        },
        Arc::new(aggregate::AggregateExecutor),
    );

    registry.register(
        StepTypeInfo {
            type_id: "debug",
            name: "Debug",
            category: "Utility",
            description: "Logs and passes its input through unchanged",
            icon: "bug",
            kind: StepKind::Transform,
        },
        Arc::new(debug::DebugExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "wait",
            name: "Wait",
            category: "Utility",
            description: "Delays before passing its input through unchanged",
            icon: "hourglass",
            kind: StepKind::Transform,
        },
        Arc::new(debug::WaitExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "json_parser",
            name: "JSON Parser",
            category: "Transform",
            description: "Parses a string field into structured JSON",
            icon: "braces",
            kind: StepKind::Transform,
        },
        Arc::new(json_parser::JsonParserExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "passthrough",
            name: "Passthrough",
            category: "Transform",
            description: "Passes its input through unchanged",
            icon: "arrow-right",
            kind: StepKind::Transform,
        },
        Arc::new(transform::PassthroughExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "pick",
            name: "Pick Fields",
            category: "Transform",
            description: "Keeps only the named fields of an object",
            icon: "check-square",
            kind: StepKind::Transform,
        },
        Arc::new(transform::PickExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "omit",
            name: "Omit Fields",
            category: "Transform",
            description: "Drops the named fields of an object",
            icon: "x-square",
            kind: StepKind::Transform,
        },
        Arc::new(transform::OmitExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "merge_objects",
            name: "Merge Objects",
            category: "Transform",
            description: "Shallow-merges a list of objects into one",
            icon: "combine",
            kind: StepKind::Transform,
        },
        Arc::new(transform::MergeObjectsExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "set_field",
            name: "Set Field",
            category: "Transform",
            description: "Sets a single field on an object",
            icon: "edit",
            kind: StepKind::Transform,
        },
        Arc::new(transform::SetFieldExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "rename_field",
            name: "Rename Field",
            category: "Transform",
            description: "Renames a single field on an object",
            icon: "tag",
            kind: StepKind::Transform,
        },
        Arc::new(transform::RenameFieldExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "flatten",
            name: "Flatten",
            category: "Transform",
            description: "Collapses one level of array nesting",
            icon: "list",
            kind: StepKind::Transform,
        },
        Arc::new(transform::FlattenExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "format_string",
            name: "Format String",
            category: "Transform",
            description: "Substitutes named placeholders into a string template",
            icon: "type",
            kind: StepKind::Transform,
        },
        Arc::new(format_string::FormatStringExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "math",
            name: "Math",
            category: "Transform",
            description: "Applies an arithmetic operator to two operands",
            icon: "divide",
            kind: StepKind::Transform,
        },
        Arc::new(math::MathExecutor),
    );
    registry.register(
        StepTypeInfo {
            type_id: "string_ops",
            name: "String Operations",
            category: "Transform",
            description: "Case conversion, concatenation, split, replace, and trim",
            icon: "text",
            kind: StepKind::Transform,
        },
        Arc::new(string_ops::StringOpsExecutor),
    );
}
