//! Append-only conversation transcript for a single agent run.

use crate::core::tools::ToolInvocation;

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// The user's prompt.
    User(String),
    /// A model reply: optional text alongside an optional tool call.
    Model {
        text: Option<String>,
        call: Option<ToolInvocation>,
    },
    /// The result string of an executed tool.
    Tool { name: String, result: String },
}

/// Ordered history of turns. Grows only; earlier entries are never mutated.
/// Owned by the loop and discarded when the process exits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Start a transcript from the user's prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::User(prompt.into())],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
