//! Stable exit codes for the sandrun CLI.

/// The model produced a final answer.
pub const OK: i32 = 0;
/// Invalid usage, configuration, or an inference-call fault.
pub const INVALID: i32 = 1;
/// The round budget ran out before a final answer.
pub const BUDGET_EXHAUSTED: i32 = 2;
/// A model reply carried neither an answer nor a usable tool call.
pub const PROTOCOL_VIOLATION: i32 = 3;
