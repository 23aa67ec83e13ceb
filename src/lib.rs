//! Sandboxed LLM tool-calling agent.
//!
//! An LLM decides, turn by turn, which of four sandboxed operations to run
//! against a confined working directory; results feed back into the
//! conversation until the model answers or the round budget runs out. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure data and dispatch types (transcript, tool
//!   invocations and results). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (sandbox path resolution, file
//!   primitives, child processes, the inference backend). Isolated to
//!   enable scripted doubles in tests.
//!
//! Orchestration modules ([`looping`], [`registry`]) coordinate core logic
//! with I/O; [`exit_codes`] pins the CLI contract.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
