//! Side-effecting operations: sandbox resolution, file primitives, child
//! processes, the inference backend, and configuration. Isolated from
//! [`crate::core`] so tests can substitute scripted doubles.

pub mod config;
pub mod files;
pub mod model;
pub mod process;
pub mod sandbox;
pub mod script;
