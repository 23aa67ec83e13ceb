//! Pure data shared by dispatch and the agent loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod tools;
pub mod transcript;
